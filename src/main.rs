use std::io;
use std::sync::Arc;
use std::time::Instant;

use actix_governor::Governor;
use actix_web::dev::Service as _;
use actix_web::{web, App, HttpServer};
use chrono::Utc;
use negotiation_backend::api::openapi::configure_swagger_ui;
use negotiation_backend::api::routes::{self, AppState, StateParts};
use negotiation_backend::application::OfferService;
use negotiation_backend::config::AppConfig;
use negotiation_backend::infrastructure::db::{migrations::run_migrations, pool::create_pool};
use negotiation_backend::infrastructure::notifications::{
    LogNotificationDispatcher, NotificationDispatcher, WebhookNotificationDispatcher,
};
use negotiation_backend::infrastructure::payment::{
    DisabledPaymentGateway, HttpPaymentGateway, PaymentGateway,
};
use negotiation_backend::infrastructure::repositories::{
    MessageRepositoryImpl, OfferRepositoryImpl,
};
use negotiation_backend::middleware::request_logging::{
    self, client_ip, header_value, log_completed, CompletedRequest,
};
use negotiation_backend::observability::error_tracking::capture_unexpected_5xx;
use negotiation_backend::observability::{init_tracing, AppMetrics};
use negotiation_backend::security::{cors_middleware, global_rate_limit_config, security_headers};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| io::Error::other(e.to_string()))?;
    config
        .validate()
        .map_err(|e| io::Error::other(e.to_string()))?;
    init_tracing(&config.logging);

    let pool = create_pool(&config.database)
        .await
        .map_err(|e| io::Error::other(format!("failed to create database pool: {e}")))?;
    run_migrations(&pool)
        .await
        .map_err(|e| io::Error::other(format!("database migrations failed: {e}")))?;

    let payments: Arc<dyn PaymentGateway> = if config.payment.checkout_url.is_some() {
        Arc::new(HttpPaymentGateway::new(&config.payment).map_err(|e| io::Error::other(e.to_string()))?)
    } else {
        info!("payment checkout url not configured; checkout disabled");
        Arc::new(DisabledPaymentGateway)
    };
    let notifier: Arc<dyn NotificationDispatcher> = if config.notifications.webhook_url.is_some() {
        Arc::new(
            WebhookNotificationDispatcher::new(&config.notifications)
                .map_err(|e| io::Error::other(e.to_string()))?,
        )
    } else {
        Arc::new(LogNotificationDispatcher)
    };

    let state = AppState::from_parts(StateParts {
        message_repo: Arc::new(MessageRepositoryImpl::new(pool.clone())),
        offer_repo: Arc::new(OfferRepositoryImpl::new(pool.clone())),
        payments,
        notifier,
        messaging: config.messaging.clone(),
        negotiation: config.negotiation.clone(),
        security: config.security.clone(),
        app_environment: config.environment.clone(),
        db_pool: Some(pool.clone()),
    });

    spawn_expiry_sweeper(
        state.offer_service.clone(),
        state.metrics.clone(),
        config.negotiation.expiry_sweep_interval(),
    );

    let governor_config =
        global_rate_limit_config(&config.security).map_err(|e| io::Error::other(e.to_string()))?;
    let security_config = config.security.clone();
    let auth_config = config.auth.clone();
    let metrics = state.metrics.clone();

    info!(host = %config.host, port = config.port, environment = %config.environment, "starting server");

    HttpServer::new(move || {
        let metrics = metrics.clone();
        App::new()
            .wrap_fn(move |req, srv| {
                let request_id = request_logging::request_id(&req);
                let path = req.path().to_string();
                let method = req.method().to_string();
                let peer = client_ip(&req);
                let metrics = metrics.clone();
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    let mut response = fut.await?;
                    response.headers_mut().insert(
                        actix_web::http::header::HeaderName::from_static(
                            request_logging::REQUEST_ID_HEADER,
                        ),
                        header_value(&request_id),
                    );

                    let status = response.status().as_u16();
                    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    metrics.record_request(status, latency_ms);
                    log_completed(&CompletedRequest {
                        request_id: &request_id,
                        method: &method,
                        path: &path,
                        client_ip: &peer,
                        status,
                        latency_ms,
                    });
                    capture_unexpected_5xx(&path, &method, status, &request_id);
                    Ok(response)
                }
            })
            .wrap(cors_middleware(&security_config))
            .wrap(security_headers())
            .wrap(Governor::new(&governor_config))
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(auth_config.clone()))
            .app_data(web::Data::from(state.metrics.clone()))
            .configure(routes::configure)
            .configure(configure_swagger_ui)
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await
}

/// Persists `expired` for pending offers past their validity. Reads already
/// overlay expiry, so a missed tick only delays the stored status.
fn spawn_expiry_sweeper(
    offers: Arc<OfferService>,
    metrics: Arc<AppMetrics>,
    every: std::time::Duration,
) {
    actix_rt::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match offers.expire_stale_offers(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => {
                    metrics.record_offers_expired(count);
                    info!(count, "expired stale offers");
                }
                Err(e) => error!(error = %e, "offer expiry sweep failed"),
            }
        }
    });
}
