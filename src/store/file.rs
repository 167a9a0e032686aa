//! JSON file backed document store

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{DocumentStore, StoreError};
use crate::config::ConfigDocument;

/// Settings document stored as pretty-printed JSON on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `$IME_SETTINGS_CONFIG`, else the platform config dir
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(crate::constants::config::PATH_ENV) {
            return PathBuf::from(path);
        }
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. A missing file is an empty document.
    pub fn load(&self) -> Result<ConfigDocument, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "settings file not found, starting from defaults");
                return Ok(ConfigDocument::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let value: Value = serde_json::from_str(&contents).map_err(|e| StoreError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        ConfigDocument::from_value(value).ok_or_else(|| StoreError::Parse {
            path: self.path.clone(),
            reason: "top level is not a JSON object".to_string(),
        })
    }

    /// Write the document through a temporary file in the same directory so
    /// the previous file stays intact if anything fails
    pub fn save(&self, document: &ConfigDocument) -> Result<(), StoreError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let io_error = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        fs::create_dir_all(parent).map_err(io_error)?;

        let contents = serde_json::to_string_pretty(document)?;
        let mut temp_file = NamedTempFile::new_in(parent).map_err(io_error)?;
        temp_file.write_all(contents.as_bytes()).map_err(io_error)?;
        temp_file.flush().map_err(io_error)?;
        temp_file.persist(&self.path).map_err(|e| io_error(e.error))?;

        info!(path = %self.path.display(), "Saved settings document");
        Ok(())
    }
}

/// Run blocking file work off the async workers
async fn blocking<T, F>(work: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::Unavailable(format!("file task did not complete: {e}")))?
}

impl DocumentStore for FileStore {
    async fn get_document(&self) -> Result<ConfigDocument, StoreError> {
        let store = self.clone();
        blocking(move || store.load()).await
    }

    async fn replace_document(&self, document: ConfigDocument) -> Result<(), StoreError> {
        let store = self.clone();
        blocking(move || store.save(&document)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("settings.json"));
        (store, temp_dir)
    }

    #[test]
    fn test_load_missing_file_is_empty_document() {
        let (store, _temp) = test_store();
        assert_eq!(store.load().unwrap(), ConfigDocument::new());
    }

    #[test]
    fn test_save_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested").join("settings.json"));
        store.save(&ConfigDocument::new()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_save_and_load_preserves_unknown_keys_and_order() {
        let (store, _temp) = test_store();
        let document = ConfigDocument::from_value(json!({
            "version": "0.1.0",
            "zenzai": { "enable": true, "profile": "", "backend": "cpu" },
            "future_slice": { "b": 1, "a": 2 },
        }))
        .unwrap();
        store.save(&document).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, document);
        let keys: Vec<&String> = loaded.as_map().keys().collect();
        assert_eq!(keys, ["version", "zenzai", "future_slice"]);
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let (store, _temp) = test_store();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_load_non_object_is_parse_error() {
        let (store, _temp) = test_store();
        fs::write(store.path(), "[1, 2, 3]").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_document_store_round_trip() {
        let (store, _temp) = test_store();
        assert_eq!(store.get_document().await.unwrap(), ConfigDocument::new());

        let document = ConfigDocument::from_value(json!({ "general": { "space_input": "follow" } })).unwrap();
        store.replace_document(document.clone()).await.unwrap();
        assert_eq!(store.get_document().await.unwrap(), document);

        fs::write(store.path(), "[]").unwrap();
        assert!(matches!(store.get_document().await, Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_save_into_unwritable_location_keeps_previous_file() {
        let (store, temp) = test_store();
        let original = ConfigDocument::from_value(json!({ "shortcuts": { "ctrl_space_toggle": false } })).unwrap();
        store.save(&original).unwrap();

        // A directory where the file should be makes persist fail
        let blocked = FileStore::new(temp.path().to_path_buf());
        assert!(blocked.save(&ConfigDocument::new()).is_err());
        assert_eq!(store.load().unwrap(), original);
    }
}
