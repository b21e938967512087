//! Shared application state.

use chatbridge_core::BridgeConfig;
use chatbridge_hub::RelayHub;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: BridgeConfig,
    pub hub: RelayHub,
    pub started_at: String,
}

impl AppState {
    pub fn new(config: BridgeConfig) -> Self {
        let hub = RelayHub::new(config.request_timeout, config.max_conversations);
        Self {
            config,
            hub,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
