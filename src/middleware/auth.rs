use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::{Actor, Role};
use crate::error::{AppError, AppResult};
use crate::observability::AppMetrics;
use crate::utils::jwt::validate_token;

/// Caller identity resolved from the bearer token issued by the identity
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Actor);

impl AuthenticatedUser {
    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn actor(&self) -> Actor {
        self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<AppResult<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req);
        if result.is_err() {
            if let Some(metrics) = req.app_data::<web::Data<AppMetrics>>() {
                metrics.record_auth_failure();
            }
        }
        ready(result)
    }
}

fn authenticate(req: &HttpRequest) -> AppResult<AuthenticatedUser> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = bearer_token(header).ok_or(AppError::Unauthorized)?;

    let config = req.app_data::<web::Data<AuthConfig>>().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("missing AuthConfig app data"))
    })?;

    let claims = validate_token(token, config.get_ref()).map_err(|error| {
        debug!(path = %req.path(), error = %error, "bearer token rejected");
        error
    })?;
    Ok(AuthenticatedUser(claims.actor()))
}

/// Case-insensitive `Bearer <token>` parsing.
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim_start();
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
