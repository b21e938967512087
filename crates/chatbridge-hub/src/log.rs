//! Conversation log — append-only record of completed exchanges.
//!
//! Purely observational: nothing on the correlation path reads it. Bounded
//! by a conversation cap with oldest-updated eviction.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One completed request/reply pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub request: String,
    pub reply: String,
    #[serde(rename = "completedAt")]
    pub completed_at: String,
}

/// A logical exchange grouping between a caller and one peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "peerId")]
    pub peer_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    pub exchanges: Vec<Exchange>,
}

/// Listing entry for a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(rename = "peerId")]
    pub peer_id: String,
    #[serde(rename = "exchangeCount")]
    pub exchange_count: usize,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

/// In-memory conversation store.
pub struct ConversationLog {
    conversations: RwLock<HashMap<String, Conversation>>,
    max_conversations: usize,
}

impl ConversationLog {
    pub fn new(max_conversations: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_conversations,
        }
    }

    /// Append a completed exchange, creating the conversation on first use.
    pub fn append(&self, conversation_id: &str, peer_id: &str, exchange: Exchange) {
        let now = chrono::Utc::now().to_rfc3339();
        let mut conversations = self.conversations.write();

        // Enforce the cap before inserting a new record (oldest-updated out).
        if !conversations.contains_key(conversation_id)
            && conversations.len() >= self.max_conversations
        {
            if let Some(oldest_id) = conversations
                .values()
                .min_by(|a, b| a.updated_at.cmp(&b.updated_at))
                .map(|c| c.id.clone())
            {
                conversations.remove(&oldest_id);
                debug!("Conversation {} evicted (cap {})", oldest_id, self.max_conversations);
            }
        }

        let entry = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Conversation {
                id: conversation_id.to_string(),
                peer_id: peer_id.to_string(),
                created_at: now.clone(),
                updated_at: now.clone(),
                exchanges: Vec::new(),
            });

        entry.exchanges.push(exchange);
        entry.updated_at = now;
    }

    /// Get a single conversation by ID.
    pub fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.conversations.read().get(conversation_id).cloned()
    }

    /// List all conversations, most recently updated first.
    pub fn list(&self) -> Vec<ConversationSummary> {
        let conversations = self.conversations.read();
        let mut summaries: Vec<ConversationSummary> = conversations
            .values()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                peer_id: c.peer_id.clone(),
                exchange_count: c.exchanges.len(),
                updated_at: c.updated_at.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Number of conversations tracked.
    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}
