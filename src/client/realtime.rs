use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::routes::ws::WsClientFrame;

use super::api::ClientError;

/// Outbound half of the realtime connection as seen by a session.
pub trait RealtimeLink: Send + Sync {
    fn join(&self, conversation_id: Uuid) -> Result<(), ClientError>;
    fn leave(&self, conversation_id: Uuid) -> Result<(), ClientError>;
    fn typing(&self, conversation_id: Uuid, is_typing: bool) -> Result<(), ClientError>;
}

/// Serializes frames onto a channel drained by the socket writer task.
#[derive(Clone)]
pub struct ChannelRealtimeLink {
    outbound: mpsc::UnboundedSender<String>,
}

impl ChannelRealtimeLink {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self { outbound }
    }

    fn send(&self, frame: &WsClientFrame) -> Result<(), ClientError> {
        let text = serde_json::to_string(frame).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.outbound
            .send(text)
            .map_err(|_| ClientError::Transport("realtime connection closed".to_string()))
    }
}

impl RealtimeLink for ChannelRealtimeLink {
    fn join(&self, conversation_id: Uuid) -> Result<(), ClientError> {
        self.send(&WsClientFrame::Join { conversation_id })
    }

    fn leave(&self, conversation_id: Uuid) -> Result<(), ClientError> {
        self.send(&WsClientFrame::Leave { conversation_id })
    }

    fn typing(&self, conversation_id: Uuid, is_typing: bool) -> Result<(), ClientError> {
        self.send(&WsClientFrame::Typing {
            conversation_id,
            is_typing,
        })
    }
}
