use serde::Serialize;
use thiserror::Error;

use super::offer::Offer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("message must have text content or an attachment")]
    EmptyMessage,

    #[error("invalid offer fields: {}", summarize(.0))]
    InvalidOfferFields(Vec<FieldViolation>),

    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    #[error("only the offer recipient may perform this action")]
    NotRecipient,

    #[error("only the original offer sender may perform this action")]
    NotSender,

    #[error("offer has expired")]
    OfferExpired(Box<Offer>),

    #[error("offer cannot make this transition from its current state")]
    InvalidTransition(Box<Offer>),

    #[error("offer has already been acted upon")]
    AlreadyActedUpon(Box<Offer>),
}

impl DomainError {
    pub fn invalid_offer_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOfferFields(vec![FieldViolation::new(field, message)])
    }

    /// The authoritative offer carried by state errors.
    pub fn current_offer(&self) -> Option<&Offer> {
        match self {
            Self::OfferExpired(offer)
            | Self::InvalidTransition(offer)
            | Self::AlreadyActedUpon(offer) => Some(offer),
            _ => None,
        }
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{}: {}", violation.field, violation.message))
        .collect::<Vec<_>>()
        .join(", ")
}
