use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::api::dtos::{MarkReadResponse, SendMessageRequest};
use crate::application::{ConversationService, RoomPublisher};
use crate::config::MessagingConfig;
use crate::domain::{Message, RoomEvent};
use crate::error::{AppError, AppResult, ValidationIssue};
use crate::infrastructure::notifications::{NotificationDispatcher, NotificationJob};
use crate::infrastructure::repositories::{AppendOutcome, MessageRepository};

#[derive(Clone)]
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository>,
    conversations: ConversationService,
    publisher: Arc<dyn RoomPublisher>,
    notifier: Arc<dyn NotificationDispatcher>,
    config: MessagingConfig,
}

impl MessageService {
    pub fn new(
        message_repo: Arc<dyn MessageRepository>,
        publisher: Arc<dyn RoomPublisher>,
        notifier: Arc<dyn NotificationDispatcher>,
        config: MessagingConfig,
    ) -> Self {
        Self {
            conversations: ConversationService::new(message_repo.clone()),
            message_repo,
            publisher,
            notifier,
            config,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size
    }

    pub async fn send_message(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        request: SendMessageRequest,
    ) -> AppResult<Message> {
        request.validate()?;
        self.check_content_length(request.content.as_deref())?;

        let conversation = self.conversations.authorize(sender_id, conversation_id).await?;
        let message = Message::compose(
            conversation_id,
            sender_id,
            request.content,
            request.file.map(Into::into),
            request.client_message_id,
            Utc::now(),
        )?;

        let outcome = self.message_repo.append_message(&message).await?;
        if let AppendOutcome::Created(created) = &outcome {
            info!(
                conversation_id = %conversation_id,
                message_id = %created.id,
                message_type = ?created.message_type,
                "message sent"
            );
            self.publisher.publish(&RoomEvent::NewMessage(created.clone()));
            if let Some(recipient_id) = conversation.other_participant(sender_id) {
                self.notifier.dispatch(NotificationJob::NewMessage {
                    recipient_id,
                    conversation_id,
                    message_id: created.id,
                    sender_id,
                    preview: created.preview(),
                });
            }
        } else {
            debug!(
                conversation_id = %conversation_id,
                message_id = %outcome.message().id,
                "duplicate send resolved to stored message"
            );
        }

        Ok(outcome.into_message())
    }

    /// Page 1 is the most recent page; messages within a page are ascending.
    pub async fn list_messages(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        page: u32,
    ) -> AppResult<Vec<Message>> {
        if page == 0 {
            return Err(AppError::validation_error("page must be at least 1"));
        }
        self.conversations.authorize(user_id, conversation_id).await?;

        let limit = i64::from(self.config.page_size);
        let offset = i64::from(page - 1) * limit;
        self.message_repo
            .find_messages(conversation_id, limit, offset)
            .await
    }

    /// Zero updates is a normal outcome, not an error.
    pub async fn mark_read(
        &self,
        reader_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<MarkReadResponse> {
        self.conversations.authorize(reader_id, conversation_id).await?;

        let message_ids = self.message_repo.mark_read(conversation_id, reader_id).await?;
        debug!(
            conversation_id = %conversation_id,
            reader_id = %reader_id,
            updated_count = message_ids.len(),
            "messages marked read"
        );

        self.publisher.publish(&RoomEvent::MessageRead {
            conversation_id,
            user_id: reader_id,
            message_ids: message_ids.clone(),
        });

        Ok(MarkReadResponse {
            updated_count: message_ids.len(),
            message_ids,
        })
    }

    fn check_content_length(&self, content: Option<&str>) -> AppResult<()> {
        let max = self.config.max_content_length;
        match content {
            Some(text) if text.chars().count() > max => {
                let message = format!("content must be at most {max} characters");
                Err(AppError::ValidationError {
                    message: message.clone(),
                    issues: vec![ValidationIssue {
                        field: "content".to_string(),
                        message,
                        code: "length".to_string(),
                    }],
                })
            }
            _ => Ok(()),
        }
    }
}
