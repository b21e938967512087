//! Caller-facing request shapes accepted by the ingress adapter.

use serde::{Deserialize, Serialize};

/// Either of the two accepted request formats. Untagged: the
/// chat-completion shape is recognized by its `messages` array, the minimal
/// shape by its direct `message` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelayRequest {
    Completion(CompletionRequest),
    Minimal(MinimalRequest),
}

/// Minimal shape: direct text plus optional routing fields.
#[derive(Debug, Clone, Deserialize)]
pub struct MinimalRequest {
    pub message: String,
    #[serde(default, rename = "requestId")]
    pub request_id: Option<String>,
    #[serde(default, rename = "peerId")]
    pub peer_id: Option<String>,
    #[serde(default, rename = "conversationId")]
    pub conversation_id: Option<String>,
}

/// OpenRouter-style chat-completion shape.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<CompletionMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "peerId")]
    pub peer_id: Option<String>,
    #[serde(default, rename = "conversationId")]
    pub conversation_id: Option<String>,
}

/// One role-tagged message in a completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

/// Structured message content: a closed recursive union over the shapes the
/// chat-completion format allows. Any object lands in `Node` (recognized
/// keys lifted out, the remainder kept for the stringify fallback); any
/// other JSON value lands in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessageContent>),
    Node {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Box<MessageContent>>,
        #[serde(flatten)]
        rest: serde_json::Map<String, serde_json::Value>,
    },
    Other(serde_json::Value),
}
