//! IPC message types for settings client ↔ settings host communication

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::Capabilities;

/// Requests sent from a settings surface to the host
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum StoreRequest {
    /// Fetch the whole settings document
    GetDocument,

    /// Replace the whole settings document
    ReplaceDocument(Value),

    /// Ask which acceleration backends the host can run
    ProbeCapabilities,

    /// Stop the host after answering
    Shutdown,
}

/// Responses sent from the host
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum StoreResponse {
    /// Current document (response to GetDocument)
    Document(Value),

    /// Document replaced
    Replaced,

    Capabilities(Capabilities),

    /// Acknowledgment of shutdown
    Ready,

    /// Error occurred
    Error(String),
}
