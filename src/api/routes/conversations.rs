use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::api::dtos::{CreateConversationRequest, PageParams, SendMessageRequest, UnreadTotalResponse};
use crate::api::routes::AppState;
use crate::error::AppResult;
use crate::middleware::AuthenticatedUser;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/conversations")
            .route("", web::get().to(list_conversations))
            .route("", web::post().to(start_conversation))
            // Registered before `/{id}` so "unread" is not parsed as an id.
            .route("/unread", web::get().to(unread_total))
            .route("/{id}", web::get().to(get_conversation))
            .route("/{id}/messages", web::get().to(list_messages))
            .route("/{id}/messages", web::post().to(send_message))
            .route("/{id}/read", web::post().to(mark_read))
            .route("/{id}/offers", web::get().to(list_offers)),
    );
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations",
    responses(
        (status = 200, description = "Caller's conversations, most recent first", body = Vec<crate::api::dtos::ConversationResponse>),
        (status = 401, description = "Unauthorized", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "conversations"
)]
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let result = state
        .conversation_service
        .list_conversations(user.user_id())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 200, description = "Existing or newly created conversation", body = crate::api::dtos::ConversationResponse),
        (status = 400, description = "Invalid participants", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "conversations"
)]
pub async fn start_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<CreateConversationRequest>,
) -> AppResult<HttpResponse> {
    let result = state
        .conversation_service
        .start_conversation(user.user_id(), payload.participant_id)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/unread",
    responses(
        (status = 200, description = "Sum of the caller's unread counts", body = UnreadTotalResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "conversations"
)]
pub async fn unread_total(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let total = state
        .conversation_service
        .total_unread(user.user_id())
        .await?;
    Ok(HttpResponse::Ok().json(UnreadTotalResponse { total }))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation summary", body = crate::api::dtos::ConversationResponse),
        (status = 403, description = "Not a participant", body = crate::api::dtos::ErrorResponse),
        (status = 404, description = "Conversation not found", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "conversations"
)]
pub async fn get_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .conversation_service
        .get_conversation(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/messages",
    params(("id" = Uuid, Path, description = "Conversation id"), PageParams),
    responses(
        (status = 200, description = "One page of messages, oldest first", body = Vec<crate::domain::Message>),
        (status = 403, description = "Not a participant", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "messages"
)]
pub async fn list_messages(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let params = query.into_inner();
    params.validate()?;
    let result = state
        .message_service
        .list_messages(user.user_id(), path.into_inner(), params.page)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/messages",
    params(("id" = Uuid, Path, description = "Conversation id")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and fanned out", body = crate::domain::Message),
        (status = 400, description = "Empty message or invalid file reference", body = crate::api::dtos::ErrorResponse),
        (status = 403, description = "Not a participant", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "messages"
)]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    payload: web::Json<SendMessageRequest>,
) -> AppResult<HttpResponse> {
    let result = state
        .message_service
        .send_message(user.user_id(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/read",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages from the other participant marked read", body = crate::api::dtos::MarkReadResponse),
        (status = 403, description = "Not a participant", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "messages"
)]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .message_service
        .mark_read(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/offers",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Offers in creation order with expiry applied", body = Vec<crate::domain::Offer>),
        (status = 403, description = "Not a participant", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn list_offers(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .list_offers(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
