//! IPC (Inter-Process Communication) via Unix sockets
//!
//! Lets settings surfaces reach the host process that owns the document.
//! Uses length-prefixed JSON over Unix domain sockets.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use crate::capability::{Capabilities, CapabilityProbe};
use crate::config::ConfigDocument;
use crate::constants::ipc::{MAX_MESSAGE_SIZE, SOCKET_NAME};
use crate::store::{DocumentStore, StoreError};

mod handler;
mod messages;
pub use handler::{run_host, spawn_host};
pub use messages::{StoreRequest, StoreResponse};

/// Host socket under the runtime dir, or the cache dir when there is none
pub fn default_socket_path() -> Result<PathBuf> {
    let base = match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(runtime_dir) => PathBuf::from(runtime_dir),
        None => dirs::cache_dir().context("No XDG_RUNTIME_DIR and no cache directory for the settings socket")?,
    };
    Ok(base.join(SOCKET_NAME))
}

/// One blocking connection to the settings host
pub struct SettingsClient {
    stream: UnixStream,
}

impl SettingsClient {
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .with_context(|| format!("Failed to connect to settings host at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Send one request and wait for its response
    pub fn request(&mut self, request: StoreRequest) -> Result<StoreResponse> {
        write_message(&mut self.stream, &request)?;
        read_message(&mut self.stream)
    }
}

/// Server listener for the settings host
pub struct SettingsServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl SettingsServer {
    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        // Create directory if needed
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Remove stale socket if exists
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind socket at {}", socket_path.display()))?;

        // Set permissions to 0700 (owner only)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Wait for the next client (blocking)
    pub(crate) fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept().context("Failed to accept IPC connection")?;
        Ok(stream)
    }

    /// Get socket path
    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for SettingsServer {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Frame a message as a little-endian u32 length followed by JSON
pub(crate) fn write_message<T: Serialize>(writer: &mut impl Write, message: &T) -> Result<()> {
    let payload = serde_json::to_vec(message).context("Failed to encode IPC message")?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len as usize <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| anyhow!("IPC message of {} bytes exceeds {MAX_MESSAGE_SIZE}", payload.len()))?;

    writer.write_all(&len.to_le_bytes()).context("Failed to write IPC frame length")?;
    writer.write_all(&payload).context("Failed to write IPC frame")?;
    writer.flush().context("Failed to flush IPC stream")
}

/// Read one frame written by [`write_message`]
pub(crate) fn read_message<T: DeserializeOwned>(reader: &mut impl Read) -> Result<T> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).context("Failed to read IPC frame length")?;
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("IPC message of {len} bytes exceeds {MAX_MESSAGE_SIZE}"));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).context("Failed to read IPC frame")?;
    serde_json::from_slice(&payload).context("Failed to decode IPC message")
}

/// Document store reached through the settings host
///
/// Each call opens its own connection, so a dropped call never leaves a
/// half-read response on a shared stream.
#[derive(Debug, Clone)]
pub struct IpcStore {
    socket_path: PathBuf,
}

impl IpcStore {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    async fn call(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
        let path = self.socket_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut client = SettingsClient::connect_to(&path)?;
            client.request(request)
        })
        .await
        .map_err(|e| StoreError::Ipc(e.to_string()))?
        .map_err(|e| StoreError::Ipc(format!("{e:#}")))
    }
}

impl DocumentStore for IpcStore {
    async fn get_document(&self) -> Result<ConfigDocument, StoreError> {
        match self.call(StoreRequest::GetDocument).await? {
            StoreResponse::Document(value) => ConfigDocument::from_value(value)
                .ok_or_else(|| StoreError::Ipc("host sent a non-object document".to_string())),
            StoreResponse::Error(e) => Err(StoreError::Remote(e)),
            other => Err(StoreError::Ipc(format!("unexpected response: {other:?}"))),
        }
    }

    async fn replace_document(&self, document: ConfigDocument) -> Result<(), StoreError> {
        match self.call(StoreRequest::ReplaceDocument(document.into_value())).await? {
            StoreResponse::Replaced => Ok(()),
            StoreResponse::Error(e) => Err(StoreError::Remote(e)),
            other => Err(StoreError::Ipc(format!("unexpected response: {other:?}"))),
        }
    }
}

impl CapabilityProbe for IpcStore {
    async fn probe_capabilities(&self) -> Result<Capabilities> {
        match self.call(StoreRequest::ProbeCapabilities).await? {
            StoreResponse::Capabilities(capabilities) => Ok(capabilities),
            StoreResponse::Error(e) => Err(anyhow!("host could not probe capabilities: {e}")),
            other => Err(anyhow!("unexpected response: {other:?}")),
        }
    }
}
