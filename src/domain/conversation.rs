use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

/// Durable two-party container. Participants are stored sorted so the pair
/// `(a, b)` and `(b, a)` resolve to the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub unread_a: i32,
    pub unread_b: i32,
    pub last_message_id: Option<Uuid>,
    pub last_message_sender_id: Option<Uuid>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized snapshot of the most recent message, for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LastMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub preview: String,
    pub sent_at: DateTime<Utc>,
}

/// Normalizes an unordered participant pair into its storage key.
pub fn participant_pair(first: Uuid, second: Uuid) -> Result<(Uuid, Uuid), DomainError> {
    if first.is_nil() || second.is_nil() {
        return Err(DomainError::InvalidParticipants(
            "both participants are required".to_string(),
        ));
    }
    if first == second {
        return Err(DomainError::InvalidParticipants(
            "a conversation needs two distinct participants".to_string(),
        ));
    }
    Ok(if first < second {
        (first, second)
    } else {
        (second, first)
    })
}

impl Conversation {
    pub fn new(first: Uuid, second: Uuid, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let (participant_a, participant_b) = participant_pair(first, second)?;
        Ok(Self {
            id: Uuid::new_v4(),
            participant_a,
            participant_b,
            unread_a: 0,
            unread_b: 0,
            last_message_id: None,
            last_message_sender_id: None,
            last_message_preview: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn includes(&self, user_id: Uuid) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    pub fn participants(&self) -> [Uuid; 2] {
        [self.participant_a, self.participant_b]
    }

    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_a == user_id {
            Some(self.participant_b)
        } else if self.participant_b == user_id {
            Some(self.participant_a)
        } else {
            None
        }
    }

    pub fn unread_count_for(&self, user_id: Uuid) -> i32 {
        if self.participant_a == user_id {
            self.unread_a.max(0)
        } else if self.participant_b == user_id {
            self.unread_b.max(0)
        } else {
            0
        }
    }

    pub fn last_message(&self) -> Option<LastMessage> {
        match (
            self.last_message_id,
            self.last_message_sender_id,
            self.last_message_at,
        ) {
            (Some(id), Some(sender_id), Some(sent_at)) => Some(LastMessage {
                id,
                sender_id,
                preview: self.last_message_preview.clone().unwrap_or_default(),
                sent_at,
            }),
            _ => None,
        }
    }
}
