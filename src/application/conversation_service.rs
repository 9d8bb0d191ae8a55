use std::cmp::Reverse;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::api::dtos::ConversationResponse;
use crate::domain::{participant_pair, Conversation};
use crate::error::{AppError, AppResult};
use crate::infrastructure::repositories::MessageRepository;

#[derive(Clone)]
pub struct ConversationService {
    message_repo: Arc<dyn MessageRepository>,
}

impl ConversationService {
    pub fn new(message_repo: Arc<dyn MessageRepository>) -> Self {
        Self { message_repo }
    }

    /// Idempotent find-or-create for an unordered participant pair.
    pub async fn get_or_create(&self, first: Uuid, second: Uuid) -> AppResult<Conversation> {
        let (participant_a, participant_b) = participant_pair(first, second)?;
        let conversation = self
            .message_repo
            .upsert_conversation(participant_a, participant_b)
            .await?;
        info!(conversation_id = %conversation.id, "conversation resolved");
        Ok(conversation)
    }

    pub async fn start_conversation(
        &self,
        user_id: Uuid,
        participant_id: Uuid,
    ) -> AppResult<ConversationResponse> {
        let conversation = self.get_or_create(user_id, participant_id).await?;
        Ok(ConversationResponse::for_viewer(&conversation, user_id))
    }

    /// Most recently active first; conversations without messages last.
    pub async fn list_conversations(&self, user_id: Uuid) -> AppResult<Vec<ConversationResponse>> {
        let mut conversations = self.message_repo.find_user_conversations(user_id).await?;
        conversations.sort_by_key(|conversation| {
            (
                conversation.last_message_at.is_none(),
                Reverse(conversation.last_message_at),
                Reverse(conversation.updated_at),
            )
        });

        Ok(conversations
            .iter()
            .map(|conversation| ConversationResponse::for_viewer(conversation, user_id))
            .collect())
    }

    pub async fn get_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<ConversationResponse> {
        let conversation = self.authorize(user_id, conversation_id).await?;
        Ok(ConversationResponse::for_viewer(&conversation, user_id))
    }

    pub async fn total_unread(&self, user_id: Uuid) -> AppResult<i64> {
        self.message_repo.total_unread(user_id).await
    }

    /// Loads the conversation and requires `user_id` to be a participant.
    pub async fn authorize(&self, user_id: Uuid, conversation_id: Uuid) -> AppResult<Conversation> {
        let conversation = self
            .message_repo
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("conversation not found".to_string()))?;

        if !conversation.includes(user_id) {
            warn!(
                user_id = %user_id,
                conversation_id = %conversation_id,
                "conversation access denied: not a participant"
            );
            return Err(AppError::Forbidden(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        Ok(conversation)
    }
}
