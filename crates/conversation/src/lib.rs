//! In-memory conversation store — one conversation per environment id.
//!
//! The store is the single owner of every `Conversation`. Readers get clones
//! (snapshots) and all mutation goes through store methods, so `clear` resets
//! the one authoritative copy and snapshots taken earlier simply go stale
//! instead of diverging.
//!
//! State is process-local; there is no cross-process consistency guarantee.
//! Backing the store with durable storage is future work.

use envhub_core::message::{Conversation, Message};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Holds one conversation per environment id.
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the conversation for `id`, creating a fresh one if absent.
    ///
    /// Lazy creation is deliberate: `get` never fails with NotFound.
    pub async fn get(&self, id: &str) -> Conversation {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.to_string())
            .or_insert_with(Conversation::new)
            .clone()
    }

    /// Replace the conversation for `id` with one preloaded from
    /// `file_messages` and `extra_messages`. Full overwrite, not a merge;
    /// `committed` follows `file_messages` being non-empty.
    pub async fn create(
        &self,
        id: &str,
        file_messages: Vec<Message>,
        extra_messages: Vec<Message>,
    ) -> Conversation {
        let conversation = Conversation::with_context(file_messages, extra_messages);
        self.conversations
            .write()
            .await
            .insert(id.to_string(), conversation.clone());
        debug!(id, committed = conversation.committed, "Conversation created");
        conversation
    }

    /// Remove the conversation. No-op if absent.
    pub async fn close(&self, id: &str) {
        self.conversations.write().await.remove(id);
    }

    /// Reset the conversation in place to the default prompt only, creating
    /// it first if absent.
    pub async fn clear(&self, id: &str) {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.to_string())
            .or_insert_with(Conversation::new)
            .reset();
    }

    /// Append a message to the conversation's log.
    pub async fn push(&self, id: &str, message: Message) {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.to_string())
            .or_insert_with(Conversation::new)
            .push(message);
    }

    /// Add to the conversation's running token count.
    pub async fn add_tokens(&self, id: &str, tokens: u64) {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .entry(id.to_string())
            .or_insert_with(Conversation::new);
        conversation.tokens += tokens;
        debug!(id, used = tokens, total = conversation.tokens, "Tokens accounted");
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
