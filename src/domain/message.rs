use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "message_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
    Link,
}

impl MessageType {
    /// `image/*` attachments render inline, everything else is a file.
    pub fn for_attachment(mime_type: Option<&str>) -> Self {
        match mime_type {
            Some(mime) if mime.trim().to_ascii_lowercase().starts_with("image/") => {
                MessageType::Image
            }
            _ => MessageType::File,
        }
    }
}

/// Reference to a file already stored by the file-storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub message_type: MessageType,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub client_message_id: Option<Uuid>,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// Builds an unsent message. Text is trimmed; a message needs text or an
    /// attachment.
    pub fn compose(
        conversation_id: Uuid,
        sender_id: Uuid,
        content: Option<String>,
        attachment: Option<Attachment>,
        client_message_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let content = content
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        if content.is_none() && attachment.is_none() {
            return Err(DomainError::EmptyMessage);
        }

        let message_type = match &attachment {
            Some(file) => MessageType::for_attachment(Some(&file.mime_type)),
            None => MessageType::Text,
        };
        let (file_url, file_name, file_type) = match attachment {
            Some(file) => (Some(file.url), Some(file.name), Some(file.mime_type)),
            None => (None, None, None),
        };

        Ok(Self {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            message_type,
            content,
            file_url,
            file_name,
            file_type,
            client_message_id,
            sent_at: now,
            is_read: false,
        })
    }

    pub fn preview(&self) -> String {
        match (&self.content, &self.file_name) {
            (Some(text), _) => text.chars().take(PREVIEW_CHARS).collect(),
            (None, Some(name)) => match self.message_type {
                MessageType::Image => format!("[image] {name}"),
                _ => format!("[file] {name}"),
            },
            (None, None) => String::new(),
        }
    }
}

/// Timestamp for a message appended after `last`: the proposed time at the
/// store's microsecond precision, pushed one microsecond past `last` when it
/// would not sort strictly after it.
pub fn next_sent_at(last: Option<DateTime<Utc>>, proposed: DateTime<Utc>) -> DateTime<Utc> {
    let proposed = proposed.trunc_subsecs(6);
    match last {
        Some(last) if proposed <= last => last.trunc_subsecs(6) + Duration::microseconds(1),
        _ => proposed,
    }
}
