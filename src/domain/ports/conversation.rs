use async_trait::async_trait;

use crate::domain::models::ConversationTurn;

/// Port for conversation history storage.
///
/// Replaces ambient shared state with an explicit injected handle. The
/// store is process-wide and shared across runs; implementations must
/// serialize `append` + `trim` per conversation id so the turn cap holds
/// even when two runs touch the same conversation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All retained turns for a conversation, oldest first.
    async fn get(&self, conversation_id: &str) -> Vec<ConversationTurn>;

    /// Append a turn.
    async fn append(&self, conversation_id: &str, turn: ConversationTurn);

    /// Drop the oldest turns beyond `max_turns`.
    async fn trim(&self, conversation_id: &str, max_turns: usize);
}
