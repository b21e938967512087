//! ChatBridge Core — configuration and shared error types.

pub mod config;
pub mod error;

pub use config::BridgeConfig;
pub use error::{Error, Result};
