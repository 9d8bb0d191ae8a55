use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{CounterTerms, Offer, OfferDraft, OfferType};

/// Recipients arrive either as a bare id or as a user object with an `id`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecipientInput {
    Id(Uuid),
    Object { id: Uuid },
}

fn deserialize_recipient<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RecipientInput::deserialize(deserializer)? {
        RecipientInput::Id(id) | RecipientInput::Object { id } => id,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOfferRequest {
    pub conversation_id: Uuid,
    #[serde(alias = "recipient", deserialize_with = "deserialize_recipient")]
    pub recipient_id: Uuid,
    /// Must match the sender's role when given.
    #[serde(rename = "type", default)]
    pub offer_type: Option<OfferType>,
    #[validate(length(min = 1, max = 200, message = "service must be 1-200 characters"))]
    pub service: String,
    #[validate(length(max = 5000, message = "description is too long"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "at most 50 deliverables"))]
    pub deliverables: Vec<String>,
    #[validate(length(max = 5000, message = "terms are too long"))]
    pub terms: Option<String>,
    #[schema(value_type = String, example = "500.00")]
    pub price: Decimal,
    pub currency: String,
    pub delivery_time: i32,
    #[serde(default)]
    pub revisions: i32,
    pub valid_until: DateTime<Utc>,
}

impl CreateOfferRequest {
    pub fn into_draft(self) -> OfferDraft {
        OfferDraft {
            service: self.service,
            description: self.description,
            deliverables: self
                .deliverables
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            terms: self.terms,
            price: self.price,
            currency: self.currency,
            delivery_time: self.delivery_time,
            revisions: self.revisions,
            valid_until: self.valid_until,
        }
    }
}

/// Counter terms. Omitted fields keep the countered offer's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CounterOfferRequest {
    #[schema(value_type = String, example = "600.00")]
    pub price: Decimal,
    #[serde(default)]
    pub delivery_time: Option<i32>,
    #[serde(default)]
    pub revisions: Option<i32>,
    #[validate(length(max = 5000, message = "terms are too long"))]
    #[serde(default)]
    pub terms: Option<String>,
    #[validate(length(max = 2000, message = "message is too long"))]
    #[serde(default)]
    pub message: Option<String>,
}

impl CounterOfferRequest {
    /// Fills the omitted fields from the offer being countered.
    pub fn resolve_against(self, original: &Offer) -> CounterTerms {
        CounterTerms {
            price: self.price,
            delivery_time: self.delivery_time.unwrap_or(original.delivery_time),
            revisions: self.revisions.unwrap_or(original.revisions),
            terms: self.terms.or_else(|| original.terms.clone()),
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub offer_id: Uuid,
    pub checkout_reference: String,
    #[schema(value_type = String, example = "500.00")]
    pub amount: Decimal,
    pub currency: String,
}
