use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{DomainError, Offer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    InternalError(#[source] anyhow::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Service unavailable: {service}")]
    ServiceUnavailable { service: String, message: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Upstream failure from {collaborator}: {message}")]
    Upstream {
        collaborator: String,
        message: String,
    },
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let mut payload = serde_json::json!({
            "error": self.error_label(),
            "message": self.public_message(),
            "code": self.error_code(),
        });

        if let Some(issues) = self.validation_issues() {
            if let Ok(details) = serde_json::to_value(issues) {
                payload["details"] = details;
            }
        }

        if let Some(current) = self.current_offer() {
            if let Ok(current) = serde_json::to_value(current) {
                payload["current"] = current;
            }
        }

        HttpResponse::build(self.status_code()).json(payload)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Domain(domain) => match domain {
                DomainError::EmptyMessage
                | DomainError::InvalidOfferFields(_)
                | DomainError::InvalidParticipants(_) => StatusCode::BAD_REQUEST,
                DomainError::NotRecipient | DomainError::NotSender => StatusCode::FORBIDDEN,
                DomainError::OfferExpired(_)
                | DomainError::InvalidTransition(_)
                | DomainError::AlreadyActedUpon(_) => StatusCode::CONFLICT,
            },
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            AppError::Upstream { .. } => "UPSTREAM_FAILURE",
            AppError::Domain(domain) => match domain {
                DomainError::EmptyMessage => "EMPTY_MESSAGE",
                DomainError::InvalidOfferFields(_) => "INVALID_OFFER_FIELDS",
                DomainError::InvalidParticipants(_) => "INVALID_PARTICIPANTS",
                DomainError::NotRecipient => "NOT_RECIPIENT",
                DomainError::NotSender => "NOT_SENDER",
                DomainError::OfferExpired(_) => "OFFER_EXPIRED",
                DomainError::InvalidTransition(_) => "INVALID_TRANSITION",
                DomainError::AlreadyActedUpon(_) => "ALREADY_ACTED_UPON",
            },
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            issues: Vec::new(),
        }
    }

    pub fn upstream(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Transient failures a caller may retry for read operations.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ServiceUnavailable { .. })
    }

    /// The authoritative offer attached to state errors, for client resync.
    pub fn current_offer(&self) -> Option<&Offer> {
        match self {
            AppError::Domain(domain) => domain.current_offer(),
            _ => None,
        }
    }

    pub(crate) fn error_label(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) | AppError::InternalError(_) => "Internal server error",
            AppError::NotFound(_) => "Not found",
            AppError::Unauthorized => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::ValidationError { .. } => "Validation error",
            AppError::Conflict(_) => "Conflict",
            AppError::BadRequest(_) => "Bad request",
            AppError::TokenExpired => "Token expired",
            AppError::InvalidToken => "Invalid token",
            AppError::ServiceUnavailable { .. } => "Service unavailable",
            AppError::Upstream { .. } => "Upstream failure",
            AppError::Domain(domain) => match domain {
                DomainError::EmptyMessage
                | DomainError::InvalidOfferFields(_)
                | DomainError::InvalidParticipants(_) => "Validation error",
                DomainError::NotRecipient | DomainError::NotSender => "Forbidden",
                DomainError::OfferExpired(_)
                | DomainError::InvalidTransition(_)
                | DomainError::AlreadyActedUpon(_) => "Conflict",
            },
        }
    }

    pub(crate) fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                "Internal server error".to_string()
            }
            AppError::NotFound(message)
            | AppError::Forbidden(message)
            | AppError::Conflict(message)
            | AppError::BadRequest(message) => message.clone(),
            AppError::ValidationError { message, .. } => message.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::TokenExpired => "Token expired".to_string(),
            AppError::InvalidToken => "Invalid token".to_string(),
            AppError::ServiceUnavailable { message, .. } => message.clone(),
            AppError::Upstream { collaborator, .. } => {
                format!("The {collaborator} service could not complete the request")
            }
            AppError::Domain(DomainError::InvalidOfferFields(violations)) => {
                match violations.as_slice() {
                    [violation] => violation.message.clone(),
                    _ => "Offer validation failed".to_string(),
                }
            }
            AppError::Domain(domain) => domain.to_string(),
        }
    }

    pub(crate) fn validation_issues(&self) -> Option<Vec<ValidationIssue>> {
        match self {
            AppError::ValidationError { issues, .. } if !issues.is_empty() => Some(issues.clone()),
            AppError::Domain(DomainError::InvalidOfferFields(violations)) => Some(
                violations
                    .iter()
                    .map(|violation| ValidationIssue {
                        field: violation.field.clone(),
                        message: violation.message.clone(),
                        code: "invalid".to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
