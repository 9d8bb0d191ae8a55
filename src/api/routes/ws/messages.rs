use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::dtos::{FileReference, SendMessageRequest};
use crate::error::{AppError, AppResult};

/// Frames a client sends over the socket:
/// `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WsClientFrame {
    Join {
        conversation_id: Uuid,
    },
    Leave {
        conversation_id: Uuid,
    },
    Typing {
        conversation_id: Uuid,
        #[serde(default = "default_is_typing")]
        is_typing: bool,
    },
    Message(WsSendMessagePayload),
    Read {
        conversation_id: Uuid,
    },
    Ping,
}

const fn default_is_typing() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WsSendMessagePayload {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "file_ref")]
    pub file: Option<FileReference>,
    #[serde(default)]
    pub client_message_id: Option<Uuid>,
}

impl WsSendMessagePayload {
    pub fn into_request(self) -> (Uuid, SendMessageRequest) {
        (
            self.conversation_id,
            SendMessageRequest {
                content: self.content,
                file: self.file,
                client_message_id: self.client_message_id,
            },
        )
    }
}

/// Control frames addressed to a single session. Room events use the same
/// `{"type", "data"}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsServerFrame {
    Joined { conversation_id: Uuid },
    Left { conversation_id: Uuid },
    Pong,
    Error { code: String, message: String },
}

impl WsServerFrame {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        WsServerFrame::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn from_app_error(error: &AppError) -> Self {
        WsServerFrame::error(error.error_code(), error.public_message())
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","data":{"code":"INTERNAL_ERROR","message":"frame encoding failed"}}"#
                .to_string()
        })
    }
}

pub(super) fn parse_client_frame(text: &str) -> AppResult<WsClientFrame> {
    serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(format!("invalid websocket frame: {e}")))
}
