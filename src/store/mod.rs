//! Document store boundary
//!
//! The engine only ever asks for the whole document or hands back a whole
//! replacement. Where the document really lives (a file, another process)
//! is up to the [`DocumentStore`] implementation.

use std::future::Future;
use std::io;
use std::path::PathBuf;

use crate::config::ConfigDocument;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Read/replace access to the persisted settings document
///
/// Neither call is retried by the engine; an error is surfaced once.
pub trait DocumentStore: Send + Sync + 'static {
    fn get_document(&self) -> impl Future<Output = Result<ConfigDocument, StoreError>> + Send;

    fn replace_document(&self, document: ConfigDocument) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Transport-level failures reading or writing the document
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error for {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse document {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("settings host reported an error: {0}")]
    Remote(String),

    #[error("document store unavailable: {0}")]
    Unavailable(String),
}
