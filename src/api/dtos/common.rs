use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::Offer;

/// Standard error response structure for API errors
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error label (e.g. "Validation error", "Conflict")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Stable machine-readable code (e.g. "OFFER_EXPIRED")
    pub code: String,
    /// Field-level validation issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationIssueDto>>,
    /// Authoritative offer state attached to state errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Offer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationIssueDto {
    pub field: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct PageParams {
    /// 1-based page, counted back from the most recent message
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
        }
    }
}

const fn default_page() -> u32 {
    1
}
