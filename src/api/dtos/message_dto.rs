use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::Attachment;

/// A file already uploaded through the file-storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct FileReference {
    #[validate(url(message = "file url must be a valid URL"))]
    pub url: String,
    #[validate(length(min = 1, max = 255, message = "file name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 127, message = "mime type must be 1-127 characters"))]
    pub mime_type: String,
}

impl From<FileReference> for Attachment {
    fn from(file: FileReference) -> Self {
        Attachment {
            url: file.url,
            name: file.name,
            mime_type: file.mime_type,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    #[validate(nested)]
    #[serde(alias = "file_ref")]
    pub file: Option<FileReference>,
    /// Idempotency key; a retried send with the same key returns the stored message.
    pub client_message_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponse {
    pub updated_count: usize,
    pub message_ids: Vec<Uuid>,
}
