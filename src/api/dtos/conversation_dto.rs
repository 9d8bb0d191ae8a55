use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Conversation, LastMessage};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    pub participant_id: Uuid,
}

/// A conversation as seen by one of its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participant_ids: Vec<Uuid>,
    pub other_participant_id: Uuid,
    pub unread_count: i32,
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationResponse {
    pub fn for_viewer(conversation: &Conversation, viewer_id: Uuid) -> Self {
        Self {
            id: conversation.id,
            participant_ids: conversation.participants().to_vec(),
            other_participant_id: conversation
                .other_participant(viewer_id)
                .unwrap_or(conversation.participant_b),
            unread_count: conversation.unread_count_for(viewer_id),
            last_message: conversation.last_message(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnreadTotalResponse {
    pub total: i64,
}
