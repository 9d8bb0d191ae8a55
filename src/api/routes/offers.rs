use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::api::dtos::{CounterOfferRequest, CreateOfferRequest};
use crate::api::routes::AppState;
use crate::error::AppResult;
use crate::middleware::AuthenticatedUser;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/offers")
            .route("", web::post().to(create_offer))
            .route("/{id}", web::get().to(get_offer))
            .route("/{id}/accept", web::post().to(accept_offer))
            .route("/{id}/reject", web::post().to(reject_offer))
            .route("/{id}/counter", web::post().to(counter_offer))
            .route("/{id}/accept-counter", web::post().to(accept_counter))
            .route("/{id}/checkout", web::post().to(checkout)),
    );
}

#[utoipa::path(
    post,
    path = "/api/v1/offers",
    request_body = CreateOfferRequest,
    responses(
        (status = 201, description = "Pending offer created", body = crate::domain::Offer),
        (status = 400, description = "Invalid offer fields", body = crate::api::dtos::ErrorResponse),
        (status = 403, description = "Not a participant", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn create_offer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<CreateOfferRequest>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .create_offer(user.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/offers/{id}",
    params(("id" = Uuid, Path, description = "Offer id")),
    responses(
        (status = 200, description = "Offer with expiry applied", body = crate::domain::Offer),
        (status = 403, description = "Not a party to the offer", body = crate::api::dtos::ErrorResponse),
        (status = 404, description = "Offer not found", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn get_offer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .get_offer(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/offers/{id}/accept",
    params(("id" = Uuid, Path, description = "Offer id")),
    responses(
        (status = 200, description = "Offer accepted", body = crate::domain::Offer),
        (status = 403, description = "Caller is not the recipient", body = crate::api::dtos::ErrorResponse),
        (status = 409, description = "Expired or no longer pending; body carries the current offer", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn accept_offer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .accept_offer(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/offers/{id}/reject",
    params(("id" = Uuid, Path, description = "Offer id")),
    responses(
        (status = 200, description = "Offer rejected", body = crate::domain::Offer),
        (status = 403, description = "Caller is not the recipient", body = crate::api::dtos::ErrorResponse),
        (status = 409, description = "Expired or no longer pending", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn reject_offer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .reject_offer(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/offers/{id}/counter",
    params(("id" = Uuid, Path, description = "Offer id")),
    request_body = CounterOfferRequest,
    responses(
        (status = 200, description = "Offer countered", body = crate::domain::Offer),
        (status = 400, description = "Invalid counter terms", body = crate::api::dtos::ErrorResponse),
        (status = 403, description = "Caller is not the recipient", body = crate::api::dtos::ErrorResponse),
        (status = 409, description = "Expired or no longer pending", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn counter_offer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    payload: web::Json<CounterOfferRequest>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .counter_offer(user.user_id(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/offers/{id}/accept-counter",
    params(("id" = Uuid, Path, description = "Countered offer id")),
    responses(
        (status = 201, description = "New pending offer built from the counter terms", body = crate::domain::Offer),
        (status = 403, description = "Caller is not the original sender", body = crate::api::dtos::ErrorResponse),
        (status = 409, description = "Offer is not countered or the counter was already accepted", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn accept_counter(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .accept_counter(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/offers/{id}/checkout",
    params(("id" = Uuid, Path, description = "Accepted offer id")),
    responses(
        (status = 200, description = "Checkout reference from the payment service", body = crate::api::dtos::CheckoutResponse),
        (status = 403, description = "Caller is not the brand on this offer", body = crate::api::dtos::ErrorResponse),
        (status = 409, description = "Offer is not accepted", body = crate::api::dtos::ErrorResponse),
        (status = 502, description = "Payment service failed", body = crate::api::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "offers"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let result = state
        .offer_service
        .initiate_checkout(user.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
