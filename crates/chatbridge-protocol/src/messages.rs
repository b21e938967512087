//! Wire messages exchanged with extension peers — matching the extension's
//! JSON surface. The `requestId` field is the sole correlation key.

use serde::{Deserialize, Serialize};

/// Messages received from a peer connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PeerMessage {
    /// Successful reply to a dispatched call.
    #[serde(rename = "AI_RESPONSE")]
    AiResponse {
        #[serde(rename = "requestId")]
        request_id: String,
        response: String,
    },
    /// Failure reply to a dispatched call.
    #[serde(rename = "ERROR")]
    Error {
        #[serde(rename = "requestId")]
        request_id: String,
        error: String,
    },
    /// Heartbeat; answered with [`HubMessage::Pong`].
    #[serde(rename = "PING")]
    Ping,
}

/// Messages sent to a peer connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubMessage {
    /// Sent once when a peer attaches, carrying its assigned identifier.
    #[serde(rename = "CONNECTION_ESTABLISHED")]
    ConnectionEstablished {
        #[serde(rename = "peerId")]
        peer_id: String,
        timestamp: String,
    },
    /// A dispatched call.
    #[serde(rename = "CLIENT_MESSAGE")]
    ClientMessage {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "conversationId")]
        conversation_id: String,
        message: String,
        timestamp: String,
    },
    /// Heartbeat reply.
    #[serde(rename = "PONG")]
    Pong,
}
