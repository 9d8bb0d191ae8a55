use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::{DomainError, FieldViolation};
use super::user::Role;

const MAX_CURRENCY_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "offer_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    BrandToCreator,
    CreatorToBrand,
}

impl OfferType {
    pub const fn for_sender(role: Role) -> Self {
        match role {
            Role::Brand => OfferType::BrandToCreator,
            Role::Creator => OfferType::CreatorToBrand,
        }
    }

    pub const fn sender_role(self) -> Role {
        match self {
            OfferType::BrandToCreator => Role::Brand,
            OfferType::CreatorToBrand => Role::Creator,
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            OfferType::BrandToCreator => OfferType::CreatorToBrand,
            OfferType::CreatorToBrand => OfferType::BrandToCreator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "offer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Countered,
}

impl OfferStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Expired => "expired",
            OfferStatus::Countered => "countered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferAction {
    Accept,
    Reject,
    Counter,
    AcceptCounter,
}

impl OfferAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            OfferAction::Accept => "accept",
            OfferAction::Reject => "reject",
            OfferAction::Counter => "counter",
            OfferAction::AcceptCounter => "accept_counter",
        }
    }

    /// Status the offer holds once this action has been applied.
    pub const fn resulting_status(self) -> OfferStatus {
        match self {
            OfferAction::Accept => OfferStatus::Accepted,
            OfferAction::Reject => OfferStatus::Rejected,
            OfferAction::Counter | OfferAction::AcceptCounter => OfferStatus::Countered,
        }
    }
}

/// Amended terms proposed by the recipient of a pending offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CounterTerms {
    #[schema(value_type = String, example = "500.00")]
    pub price: Decimal,
    pub delivery_time: i32,
    pub revisions: i32,
    pub terms: Option<String>,
    pub message: Option<String>,
}

impl CounterTerms {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut violations = Vec::new();
        check_commercials(
            self.price,
            self.delivery_time,
            self.revisions,
            &mut violations,
        );
        into_result(violations)
    }
}

/// Caller-supplied fields of a new offer.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferDraft {
    pub service: String,
    pub description: Option<String>,
    pub deliverables: Vec<String>,
    pub terms: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub delivery_time: i32,
    pub revisions: i32,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Offer {
    pub id: Uuid,
    pub conversation_id: Uuid,
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    pub service: String,
    pub description: Option<String>,
    pub deliverables: Vec<String>,
    pub terms: Option<String>,
    #[schema(value_type = String, example = "500.00")]
    pub price: Decimal,
    pub currency: String,
    pub delivery_time: i32,
    pub revisions: i32,
    pub valid_until: DateTime<Utc>,
    pub status: OfferStatus,
    pub counter_offer: Option<CounterTerms>,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    /// Countered offer this one was spawned from.
    pub parent_offer_id: Option<Uuid>,
    /// Offer spawned when this one's counter was accepted.
    pub follow_up_offer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn create(
        conversation_id: Uuid,
        sender_id: Uuid,
        sender_role: Role,
        recipient_id: Uuid,
        draft: OfferDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mut violations = Vec::new();
        if draft.service.trim().is_empty() {
            violations.push(FieldViolation::new("service", "service is required"));
        }
        let currency = draft.currency.trim().to_string();
        if currency.is_empty() || currency.chars().count() > MAX_CURRENCY_LEN {
            violations.push(FieldViolation::new(
                "currency",
                "currency must be a code or symbol",
            ));
        }
        check_commercials(
            draft.price,
            draft.delivery_time,
            draft.revisions,
            &mut violations,
        );
        if draft.valid_until <= now {
            violations.push(FieldViolation::new(
                "valid_until",
                "valid_until must be in the future",
            ));
        }
        if sender_id == recipient_id {
            violations.push(FieldViolation::new(
                "recipient_id",
                "an offer cannot be sent to yourself",
            ));
        }
        into_result(violations)?;

        Ok(Self {
            id: Uuid::now_v7(),
            conversation_id,
            offer_type: OfferType::for_sender(sender_role),
            service: draft.service.trim().to_string(),
            description: draft.description,
            deliverables: draft.deliverables,
            terms: draft.terms,
            price: draft.price,
            currency,
            delivery_time: draft.delivery_time,
            revisions: draft.revisions,
            valid_until: draft.valid_until,
            status: OfferStatus::Pending,
            counter_offer: None,
            sender_id,
            recipient_id,
            parent_offer_id: None,
            follow_up_offer_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Expiry is derived at read time: a pending offer past `valid_until`
    /// is expired whether or not the sweeper has persisted it yet.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            OfferStatus::Expired => true,
            OfferStatus::Pending => now > self.valid_until,
            _ => false,
        }
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> OfferStatus {
        if self.is_expired_at(now) {
            OfferStatus::Expired
        } else {
            self.status
        }
    }

    pub fn with_effective_status(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }

    /// The brand side of the deal, who pays once terms are accepted.
    pub fn brand_id(&self) -> Uuid {
        match self.offer_type {
            OfferType::BrandToCreator => self.sender_id,
            OfferType::CreatorToBrand => self.recipient_id,
        }
    }

    /// Decides whether `actor_id` may apply `action` at `now`, returning the
    /// status the stored offer must currently hold for the write to succeed.
    pub fn check_transition(
        &self,
        action: OfferAction,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OfferStatus, DomainError> {
        match action {
            OfferAction::Accept | OfferAction::Reject | OfferAction::Counter => {
                if actor_id != self.recipient_id {
                    return Err(DomainError::NotRecipient);
                }
            }
            OfferAction::AcceptCounter => {
                if actor_id != self.sender_id {
                    return Err(DomainError::NotSender);
                }
            }
        }

        if self.is_expired_at(now) {
            return Err(DomainError::OfferExpired(Box::new(
                self.clone().with_effective_status(now),
            )));
        }

        let current = Box::new(self.clone());
        match (action, self.status) {
            (OfferAction::AcceptCounter, OfferStatus::Countered) => {
                if self.follow_up_offer_id.is_some() {
                    Err(DomainError::AlreadyActedUpon(current))
                } else {
                    Ok(OfferStatus::Countered)
                }
            }
            (OfferAction::AcceptCounter, _) => Err(DomainError::InvalidTransition(current)),
            (_, OfferStatus::Pending) => Ok(OfferStatus::Pending),
            (_, status) if status == action.resulting_status() => {
                Err(DomainError::AlreadyActedUpon(current))
            }
            _ => Err(DomainError::InvalidTransition(current)),
        }
    }

    /// Builds the fresh pending offer created when the original sender
    /// accepts a counter: roles flip and the counter terms become the price.
    pub fn follow_up(&self, now: DateTime<Utc>, validity: Duration) -> Result<Offer, DomainError> {
        let counter = self
            .counter_offer
            .as_ref()
            .ok_or_else(|| DomainError::InvalidTransition(Box::new(self.clone())))?;

        Ok(Offer {
            id: Uuid::now_v7(),
            conversation_id: self.conversation_id,
            offer_type: self.offer_type.flipped(),
            service: self.service.clone(),
            description: self.description.clone(),
            deliverables: self.deliverables.clone(),
            terms: counter.terms.clone().or_else(|| self.terms.clone()),
            price: counter.price,
            currency: self.currency.clone(),
            delivery_time: counter.delivery_time,
            revisions: counter.revisions,
            valid_until: now + validity,
            status: OfferStatus::Pending,
            counter_offer: None,
            sender_id: self.recipient_id,
            recipient_id: self.sender_id,
            parent_offer_id: Some(self.id),
            follow_up_offer_id: None,
            created_at: now,
            updated_at: now,
        })
    }
}

fn check_commercials(
    price: Decimal,
    delivery_time: i32,
    revisions: i32,
    violations: &mut Vec<FieldViolation>,
) {
    if price <= Decimal::ZERO {
        violations.push(FieldViolation::new("price", "price must be greater than zero"));
    }
    if delivery_time <= 0 {
        violations.push(FieldViolation::new(
            "delivery_time",
            "delivery_time must be at least one day",
        ));
    }
    if revisions < 0 {
        violations.push(FieldViolation::new(
            "revisions",
            "revisions cannot be negative",
        ));
    }
}

fn into_result(violations: Vec<FieldViolation>) -> Result<(), DomainError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(DomainError::InvalidOfferFields(violations))
    }
}
