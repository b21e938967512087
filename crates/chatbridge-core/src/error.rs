//! Error types for ChatBridge.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No peer available ({attached} attached but not writable)")]
    NoPeerAvailable { attached: usize },

    #[error("Duplicate request id: {0}")]
    DuplicateRequestId(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    RequestTimeout(Duration),

    #[error("Peer disconnected: {0}")]
    PeerDisconnected(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Empty or invalid message")]
    EmptyOrInvalidMessage,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable label, used in HTTP error bodies so callers
    /// can tell transient conditions apart from definite ones.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NoPeerAvailable { .. } => "noPeerAvailable",
            Error::DuplicateRequestId(_) => "duplicateRequestId",
            Error::RequestTimeout(_) => "requestTimeout",
            Error::PeerDisconnected(_) => "peerDisconnected",
            Error::Agent(_) => "agentError",
            Error::EmptyOrInvalidMessage => "emptyOrInvalidMessage",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
