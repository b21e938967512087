//! ChatBridge Protocol — wire messages and the normalized call shapes.

pub mod call;
pub mod messages;

pub use call::{OutboundCall, RelayReply};
pub use messages::{HubMessage, PeerMessage};
