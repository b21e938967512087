//! Normalized call shapes — the single internal form every ingress format
//! reduces to, and the reply handed back to the original caller.

use serde::{Deserialize, Serialize};

/// An outbound call awaiting dispatch to a peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundCall {
    /// Message text delivered to the agent. Required, non-blank.
    pub text: String,
    /// Correlation key; generated at dispatch when absent. Callers that
    /// supply their own must use collision-resistant values.
    #[serde(skip_serializing_if = "Option::is_none", rename = "requestId")]
    pub request_id: Option<String>,
    /// Target a specific peer; any writable peer when absent.
    #[serde(skip_serializing_if = "Option::is_none", rename = "peerId")]
    pub peer_id: Option<String>,
    /// Conversation the exchange belongs to; generated when absent.
    #[serde(skip_serializing_if = "Option::is_none", rename = "conversationId")]
    pub conversation_id: Option<String>,
}

impl OutboundCall {
    /// A plain call with no routing overrides.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_id: None,
            peer_id: None,
            conversation_id: None,
        }
    }
}

/// The reply returned to the original caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayReply {
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    pub text: String,
}
