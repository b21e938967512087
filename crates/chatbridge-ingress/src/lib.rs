//! ChatBridge Ingress — normalizes caller request shapes into the single
//! internal call form. Pure and stateless.

pub mod extract;
pub mod types;

pub use extract::normalize;
pub use types::{CompletionMessage, CompletionRequest, MessageContent, MinimalRequest, RelayRequest};
