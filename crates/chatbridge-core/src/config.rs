//! Configuration from environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on a call's wait for its reply. Remote agents relay through
/// a third-party UI that can take minutes to finish generating, so the
/// correlation layer must not impose a low-latency assumption of its own.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Top-level ChatBridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// HTTP/WebSocket server port.
    pub port: u16,
    /// How long a dispatched call may wait for its correlated reply.
    pub request_timeout: Duration,
    /// Conversation log cap; the oldest-updated record is evicted beyond it.
    pub max_conversations: usize,
}

impl BridgeConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let request_timeout = std::env::var("CHATBRIDGE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let max_conversations = std::env::var("CHATBRIDGE_MAX_CONVERSATIONS")
            .ok()
            .and_then(|m| m.parse().ok())
            .unwrap_or(defaults.max_conversations);

        Self {
            port,
            request_timeout,
            max_conversations,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: 3100,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_conversations: 1000,
        }
    }
}
