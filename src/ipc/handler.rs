//! IPC request handler for the settings host

use anyhow::{Context, Result};
use std::os::unix::net::UnixStream;
use tracing::{debug, error, info, warn};

use super::{SettingsServer, StoreRequest, StoreResponse};
use crate::capability::Capabilities;
use crate::config::ConfigDocument;
use crate::store::FileStore;

/// Host side of one client connection
struct HostConnection {
    stream: UnixStream,
}

impl HostConnection {
    fn recv_request(&mut self) -> Result<StoreRequest> {
        super::read_message(&mut self.stream)
    }

    fn send_response(&mut self, resp: &StoreResponse) -> Result<()> {
        super::write_message(&mut self.stream, resp)
    }
}

/// What to do after answering a request
enum Flow {
    Continue,
    Shutdown,
}

/// Spawn the host loop on its own thread
pub fn spawn_host(
    server: SettingsServer,
    store: FileStore,
    capabilities: Capabilities,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = run_host(&server, &store, capabilities) {
            error!(error = ?e, "settings host crashed");
        }
    })
}

/// Serve document requests until a client asks for shutdown
///
/// Clients are handled one at a time, so reads and replaces never overlap.
pub fn run_host(server: &SettingsServer, store: &FileStore, capabilities: Capabilities) -> Result<()> {
    info!(socket = ?server.path(), document = ?store.path(), "settings host started");

    loop {
        let mut client = HostConnection {
            stream: server.accept().context("Settings host stopped accepting clients")?,
        };
        debug!("settings client connected");

        loop {
            let request = match client.recv_request() {
                Ok(request) => request,
                Err(e) => {
                    debug!(error = ?e, "IPC connection closed or error");
                    break;
                }
            };

            match handle_request(&mut client, store, capabilities, request) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Shutdown) => {
                    info!("Received shutdown request via IPC");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = ?e, "failed to answer settings client");
                    break;
                }
            }
        }
    }
}

fn handle_request(
    client: &mut HostConnection,
    store: &FileStore,
    capabilities: Capabilities,
    request: StoreRequest,
) -> Result<Flow> {
    let (response, flow) = match request {
        StoreRequest::GetDocument => {
            let response = match store.load() {
                Ok(document) => StoreResponse::Document(document.into_value()),
                Err(e) => {
                    error!(error = %e, "failed to load settings document");
                    StoreResponse::Error(e.to_string())
                }
            };
            (response, Flow::Continue)
        }

        StoreRequest::ReplaceDocument(value) => {
            let response = match ConfigDocument::from_value(value) {
                Some(document) => match store.save(&document) {
                    Ok(()) => StoreResponse::Replaced,
                    Err(e) => {
                        error!(error = %e, "failed to save settings document");
                        StoreResponse::Error(e.to_string())
                    }
                },
                None => StoreResponse::Error("document must be a JSON object".to_string()),
            };
            (response, Flow::Continue)
        }

        StoreRequest::ProbeCapabilities => (StoreResponse::Capabilities(capabilities), Flow::Continue),

        StoreRequest::Shutdown => (StoreResponse::Ready, Flow::Shutdown),
    };

    client.send_response(&response)?;
    Ok(flow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityProbe;
    use crate::ipc::{IpcStore, SettingsClient};
    use crate::store::DocumentStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn start_host(temp: &TempDir, capabilities: Capabilities) -> (std::path::PathBuf, std::thread::JoinHandle<()>) {
        let socket = temp.path().join("host.sock");
        let server = SettingsServer::bind_to(socket.clone()).unwrap();
        let store = FileStore::new(temp.path().join("settings.json"));
        (socket, spawn_host(server, store, capabilities))
    }

    fn shutdown(socket: &std::path::Path, handle: std::thread::JoinHandle<()>) {
        let mut client = SettingsClient::connect_to(socket).unwrap();
        assert_eq!(client.request(StoreRequest::Shutdown).unwrap(), StoreResponse::Ready);
        handle.join().unwrap();
    }

    #[test]
    fn test_shutdown_after_probe_removes_socket() {
        let temp = TempDir::new().unwrap();
        let (socket, handle) = start_host(&temp, Capabilities::cpu_only());

        let mut client = SettingsClient::connect_to(&socket).unwrap();
        assert_eq!(
            client.request(StoreRequest::ProbeCapabilities).unwrap(),
            StoreResponse::Capabilities(Capabilities::cpu_only())
        );
        drop(client);

        shutdown(&socket, handle);
        assert!(!socket.exists());
    }

    #[test]
    fn test_replace_then_get_over_socket() {
        let temp = TempDir::new().unwrap();
        let (socket, handle) = start_host(&temp, Capabilities::cpu_only());

        let mut client = SettingsClient::connect_to(&socket).unwrap();
        let document = json!({ "version": "0.1.0", "shortcuts": { "ctrl_space_toggle": false } });
        assert_eq!(
            client.request(StoreRequest::ReplaceDocument(document.clone())).unwrap(),
            StoreResponse::Replaced
        );
        assert_eq!(
            client.request(StoreRequest::GetDocument).unwrap(),
            StoreResponse::Document(document)
        );
        assert!(matches!(
            client.request(StoreRequest::ReplaceDocument(json!([1]))).unwrap(),
            StoreResponse::Error(_)
        ));
        drop(client);

        shutdown(&socket, handle);
    }

    #[tokio::test]
    async fn test_ipc_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let capabilities = Capabilities {
            cpu: true,
            cuda: true,
            vulkan: false,
        };
        let (socket, handle) = start_host(&temp, capabilities);

        let store = IpcStore::new(socket.clone());
        assert_eq!(store.get_document().await.unwrap(), ConfigDocument::new());

        let document = ConfigDocument::from_value(json!({ "zenzai": { "enable": true } })).unwrap();
        store.replace_document(document.clone()).await.unwrap();
        assert_eq!(store.get_document().await.unwrap(), document);
        assert_eq!(store.probe_capabilities().await.unwrap(), capabilities);

        shutdown(&socket, handle);
    }

    #[tokio::test]
    async fn test_ipc_store_without_host_is_transport_error() {
        let temp = TempDir::new().unwrap();
        let store = IpcStore::new(temp.path().join("missing.sock"));
        assert!(matches!(store.get_document().await, Err(crate::store::StoreError::Ipc(_))));
    }
}
