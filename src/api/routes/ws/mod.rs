use std::time::Duration;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::bearer_token;
use crate::utils::jwt::validate_token;

mod handlers;
mod hub;
mod messages;

use self::handlers::{handle_client_frame, WsContext};
use self::messages::parse_client_frame;

pub use self::hub::WsConnectionHub;
pub use self::messages::{WsClientFrame, WsSendMessagePayload, WsServerFrame};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_upgrade));
}

async fn ws_upgrade(
    request: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    if state.app_environment.eq_ignore_ascii_case("production") && !is_secure_ws_request(&request)
    {
        return Err(AppError::BadRequest(
            "wss is required in production".to_string(),
        ));
    }

    let user_id = authenticate_ws_user(&request).map_err(|error| {
        state.metrics.record_auth_failure();
        error
    })?;

    let (response, session, stream) = actix_ws::handle(&request, payload)
        .map_err(|_| AppError::BadRequest("invalid websocket upgrade".to_string()))?;

    let ctx = WsContext {
        hub: state.ws_hub.clone(),
        conversations: state.conversation_service.clone(),
        messages: state.message_service.clone(),
        metrics: state.metrics.clone(),
    };
    let (session_id, outbound_rx) = ctx.hub.register(user_id);
    ctx.metrics.ws_connected();
    info!(user_id = %user_id, session_id = %session_id, "websocket connected");

    actix_web::rt::spawn(async move {
        ws_loop(session, stream, outbound_rx, &ctx, session_id, user_id).await;
        ctx.hub.unregister(session_id);
        ctx.metrics.set_open_rooms(ctx.hub.room_count());
        ctx.metrics.ws_disconnected();
        info!(user_id = %user_id, session_id = %session_id, "websocket disconnected");
    });

    Ok(response)
}

fn authenticate_ws_user(request: &HttpRequest) -> AppResult<Uuid> {
    let token = extract_ws_token(request).ok_or(AppError::Unauthorized)?;
    let config = request
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("missing AuthConfig app data")))?;
    let claims = validate_token(&token, config.get_ref())?;
    Ok(claims.sub)
}

/// Browsers cannot set headers on a websocket handshake, so the token may also
/// arrive as a `token` query parameter or a `bearer, <token>` subprotocol.
fn extract_ws_token(request: &HttpRequest) -> Option<String> {
    if let Ok(query) = web::Query::<TokenQuery>::from_query(request.query_string()) {
        if let Some(token) = query.token.as_deref().filter(|token| !token.is_empty()) {
            return Some(token.to_string());
        }
    }

    if let Some(token) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
    {
        return Some(token.to_string());
    }

    let protocol = request
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())?;
    let mut parts = protocol.split(',');
    let scheme = parts.next()?.trim();
    let token = parts.next()?.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn is_secure_ws_request(request: &HttpRequest) -> bool {
    if request.connection_info().scheme() == "https" {
        return true;
    }

    request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

async fn ws_loop(
    mut session: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    ctx: &WsContext,
    session_id: Uuid,
    user_id: Uuid,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut last_seen = tokio::time::Instant::now();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if last_seen.elapsed() > CLIENT_TIMEOUT {
                    debug!(session_id = %session_id, "websocket heartbeat timed out");
                    let _ = session.close(None).await;
                    break;
                }
                if session.ping(b"").await.is_err() {
                    break;
                }
            }
            maybe_message = stream.next() => {
                let Some(Ok(message)) = maybe_message else {
                    break;
                };
                last_seen = tokio::time::Instant::now();

                match message {
                    actix_ws::Message::Ping(bytes) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    actix_ws::Message::Text(text) => {
                        let reply = match parse_client_frame(&text) {
                            Ok(frame) => {
                                match handle_client_frame(ctx, session_id, user_id, frame).await {
                                    Ok(reply) => reply,
                                    Err(error) => {
                                        if matches!(error, AppError::Forbidden(_)) {
                                            warn!(user_id = %user_id, error = %error, "websocket action denied");
                                        }
                                        Some(WsServerFrame::from_app_error(&error))
                                    }
                                }
                            }
                            Err(_) => Some(WsServerFrame::error(
                                "BAD_MESSAGE",
                                "frame is not a valid client message",
                            )),
                        };
                        if let Some(reply) = reply {
                            if session.text(reply.to_text()).await.is_err() {
                                break;
                            }
                        }
                    }
                    actix_ws::Message::Binary(_) => {
                        let reply = WsServerFrame::error(
                            "UNSUPPORTED_BINARY",
                            "binary frames are not supported",
                        );
                        if session.text(reply.to_text()).await.is_err() {
                            break;
                        }
                    }
                    actix_ws::Message::Close(reason) => {
                        let _ = session.close(reason).await;
                        break;
                    }
                    _ => {}
                }
            }
            maybe_outbound = outbound_rx.recv() => {
                let Some(payload) = maybe_outbound else {
                    break;
                };
                if session.text(payload).await.is_err() {
                    break;
                }
            }
        }
    }
}
