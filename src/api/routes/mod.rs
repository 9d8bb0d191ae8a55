use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use sqlx::PgPool;

use crate::application::{ConversationService, MessageService, OfferService, RoomPublisher};
use crate::config::{MessagingConfig, NegotiationConfig, SecurityConfig};
use crate::error::{AppError, AppResult};
use crate::infrastructure::notifications::NotificationDispatcher;
use crate::infrastructure::payment::PaymentGateway;
use crate::infrastructure::repositories::{MessageRepository, OfferRepository};
use crate::observability::AppMetrics;

pub mod conversations;
pub mod offers;
pub mod ws;

#[derive(Clone)]
pub struct AppState {
    pub conversation_service: Arc<ConversationService>,
    pub message_service: Arc<MessageService>,
    pub offer_service: Arc<OfferService>,
    pub security: SecurityConfig,
    pub app_environment: String,
    pub metrics: Arc<AppMetrics>,
    /// `None` when running against in-memory repositories.
    pub db_pool: Option<PgPool>,
    pub ws_hub: ws::WsConnectionHub,
}

/// Repositories, collaborators and settings the services are wired from.
pub struct StateParts {
    pub message_repo: Arc<dyn MessageRepository>,
    pub offer_repo: Arc<dyn OfferRepository>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub messaging: MessagingConfig,
    pub negotiation: NegotiationConfig,
    pub security: SecurityConfig,
    pub app_environment: String,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Wires the services with the websocket hub as their room publisher.
    pub fn from_parts(parts: StateParts) -> Self {
        let ws_hub = ws::WsConnectionHub::default();
        let publisher: Arc<dyn RoomPublisher> = Arc::new(ws_hub.clone());

        Self {
            conversation_service: Arc::new(ConversationService::new(parts.message_repo.clone())),
            message_service: Arc::new(MessageService::new(
                parts.message_repo.clone(),
                publisher.clone(),
                parts.notifier.clone(),
                parts.messaging,
            )),
            offer_service: Arc::new(OfferService::new(
                parts.offer_repo,
                parts.message_repo,
                publisher,
                parts.payments,
                parts.notifier,
                parts.negotiation.counter_offer_validity(),
            )),
            security: parts.security,
            app_environment: parts.app_environment,
            metrics: Arc::new(AppMetrics::default()),
            db_pool: parts.db_pool,
            ws_hub,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(conversations::configure)
            .configure(offers::configure),
    )
    .configure(ws::configure)
    .route("/health", web::get().to(health))
    .route("/ready", web::get().to(ready))
    .route("/metrics", web::get().to(metrics));
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check passed")
    ),
    tag = "health"
)]
pub async fn health() -> &'static str {
    "ok"
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Readiness check passed"),
        (status = 503, description = "Service not ready"),
    ),
    tag = "health"
)]
pub async fn ready(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    if let Some(pool) = &state.db_pool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(pool)
            .await
            .map_err(|e| AppError::ServiceUnavailable {
                service: "database".to_string(),
                message: format!("Service not ready: {e}"),
            })?;
    }
    Ok(HttpResponse::Ok().body("ready"))
}

async fn metrics(state: web::Data<AppState>, request: HttpRequest) -> AppResult<HttpResponse> {
    let admin_token = state
        .security
        .metrics_admin_token
        .as_deref()
        .filter(|token| !token.is_empty());
    let presented = request
        .headers()
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok());

    let admin = admin_token.is_some() && presented == admin_token;
    if !admin && state.security.metrics_allow_private_only {
        let ip = request
            .peer_addr()
            .map(|addr| addr.ip())
            .ok_or(AppError::Unauthorized)?;
        if !is_private_or_loopback(ip) {
            return Err(AppError::Unauthorized);
        }
    }

    let (db_size, db_idle) = pool_stats(&state);
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(state.metrics.render_prometheus(db_size, db_idle)))
}

fn is_private_or_loopback(ip: std::net::IpAddr) -> bool {
    match ip {
        std::net::IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        std::net::IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local(),
    }
}

fn pool_stats(state: &AppState) -> (u32, usize) {
    state
        .db_pool
        .as_ref()
        .map_or((0, 0), |pool| (pool.size(), pool.num_idle()))
}
