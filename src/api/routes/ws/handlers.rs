use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::{ConversationService, MessageService};
use crate::domain::RoomEvent;
use crate::error::{AppError, AppResult};
use crate::observability::AppMetrics;

use super::messages::{WsClientFrame, WsServerFrame};
use super::WsConnectionHub;

/// Everything a socket session needs to act on client frames.
#[derive(Clone)]
pub(super) struct WsContext {
    pub hub: WsConnectionHub,
    pub conversations: Arc<ConversationService>,
    pub messages: Arc<MessageService>,
    pub metrics: Arc<AppMetrics>,
}

/// Applies one client frame. Returns the control frame to send back to this
/// session, if any; room events go out through the hub.
pub(super) async fn handle_client_frame(
    ctx: &WsContext,
    session_id: Uuid,
    user_id: Uuid,
    frame: WsClientFrame,
) -> AppResult<Option<WsServerFrame>> {
    match frame {
        WsClientFrame::Ping => Ok(Some(WsServerFrame::Pong)),
        WsClientFrame::Join { conversation_id } => {
            ctx.conversations.authorize(user_id, conversation_id).await?;
            if ctx.hub.join(session_id, conversation_id) {
                debug!(session_id = %session_id, conversation_id = %conversation_id, "joined room");
            }
            ctx.metrics.set_open_rooms(ctx.hub.room_count());
            Ok(Some(WsServerFrame::Joined { conversation_id }))
        }
        WsClientFrame::Leave { conversation_id } => {
            ctx.hub.leave(session_id, conversation_id);
            ctx.metrics.set_open_rooms(ctx.hub.room_count());
            Ok(Some(WsServerFrame::Left { conversation_id }))
        }
        WsClientFrame::Typing {
            conversation_id,
            is_typing,
        } => {
            ensure_joined(ctx, session_id, conversation_id)?;
            let event = RoomEvent::Typing {
                conversation_id,
                user_id,
                is_typing,
            };
            let payload = serde_json::to_string(&event)
                .map_err(|e| AppError::InternalError(e.into()))?;
            ctx.hub.broadcast(conversation_id, &payload, Some(session_id));
            Ok(None)
        }
        WsClientFrame::Message(payload) => {
            let (conversation_id, request) = payload.into_request();
            ctx.messages
                .send_message(user_id, conversation_id, request)
                .await?;
            Ok(None)
        }
        WsClientFrame::Read { conversation_id } => {
            ctx.messages.mark_read(user_id, conversation_id).await?;
            Ok(None)
        }
    }
}

/// Typing is ephemeral and only relayed for rooms the session has joined,
/// which already proved participation.
fn ensure_joined(ctx: &WsContext, session_id: Uuid, conversation_id: Uuid) -> AppResult<()> {
    if ctx.hub.is_member(session_id, conversation_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "join the conversation before sending typing events".to_string(),
        ))
    }
}
