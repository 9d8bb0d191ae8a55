use crate::domain::{Conversation, CounterTerms, Message, Offer, OfferStatus};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result of an append; a retried send with a known `client_message_id`
/// yields the stored copy without touching counters.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    Created(Message),
    Duplicate(Message),
}

impl AppendOutcome {
    pub fn message(&self) -> &Message {
        match self {
            AppendOutcome::Created(message) | AppendOutcome::Duplicate(message) => message,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            AppendOutcome::Created(message) | AppendOutcome::Duplicate(message) => message,
        }
    }

    pub const fn is_created(&self) -> bool {
        matches!(self, AppendOutcome::Created(_))
    }
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find-or-create keyed by an already normalized `(a, b)` pair.
    async fn upsert_conversation(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
    ) -> AppResult<Conversation>;
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>>;
    async fn find_user_conversations(&self, user_id: Uuid) -> AppResult<Vec<Conversation>>;

    /// Appends atomically: clamps `sent_at` to the conversation's last
    /// message, refreshes the last-message snapshot and bumps the other
    /// participant's unread counter.
    async fn append_message(&self, message: &Message) -> AppResult<AppendOutcome>;

    /// One page counted back from the newest message, returned oldest first.
    async fn find_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>>;

    /// Flags unread messages from the other participant and returns their ids
    /// in timeline order.
    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> AppResult<Vec<Uuid>>;

    async fn total_unread(&self, user_id: Uuid) -> AppResult<i64> {
        let conversations = self.find_user_conversations(user_id).await?;
        Ok(conversations
            .iter()
            .map(|conversation| i64::from(conversation.unread_count_for(user_id)))
            .sum())
    }
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn create(&self, offer: &Offer) -> AppResult<Offer>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Offer>>;
    async fn find_by_conversation(&self, conversation_id: Uuid) -> AppResult<Vec<Offer>>;

    /// Compare-and-swap on status. Returns `None` when the stored status is no
    /// longer `expected` or the offer lapsed before `now`.
    async fn transition_status(
        &self,
        id: Uuid,
        expected: OfferStatus,
        next: OfferStatus,
        counter: Option<&CounterTerms>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Offer>>;

    /// Inserts `follow_up` and links it to the countered offer in one step.
    /// Returns `None` when the countered offer was already claimed.
    async fn spawn_follow_up(&self, original_id: Uuid, follow_up: &Offer)
        -> AppResult<Option<Offer>>;

    async fn find_expired_pending(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Offer>>;

    /// Persists `expired` for a lapsed pending offer. `None` if it moved on.
    async fn mark_expired(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Offer>>;
}
