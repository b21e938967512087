//! ChatBridge Hub — peer connection registry, call correlation, dispatch.

pub mod hub;
pub mod log;

pub use hub::{PeerHandle, PeerSender, PeerSummary, RelayHub};
pub use log::{Conversation, ConversationLog, ConversationSummary, Exchange};
