//! In-memory conversation history store.
//!
//! Process-lifetime only; nothing survives a restart. One mutex guards
//! the whole map, so `append` + `trim` are serialized and the per-
//! conversation turn cap always holds, even when two runs touch the same
//! conversation id. A conversation id is expected to be driven by a
//! single session at a time; concurrent runs against the same id may
//! interleave append order but never corrupt the cap.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::ConversationTurn;
use crate::domain::ports::ConversationStore;

/// Mutex-guarded map from conversation id to retained turns.
#[derive(Default)]
pub struct InMemoryConversationStore {
    turns: Mutex<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked conversations.
    pub async fn conversation_count(&self) -> usize {
        self.turns.lock().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, conversation_id: &str) -> Vec<ConversationTurn> {
        self.turns
            .lock()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn append(&self, conversation_id: &str, turn: ConversationTurn) {
        self.turns
            .lock()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .push(turn);
    }

    async fn trim(&self, conversation_id: &str, max_turns: usize) {
        let mut turns = self.turns.lock().await;
        if let Some(history) = turns.get_mut(conversation_id) {
            let excess = history.len().saturating_sub(max_turns);
            if excess > 0 {
                history.drain(..excess);
            }
        }
    }
}
