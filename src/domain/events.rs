use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::message::Message;
use super::offer::Offer;

/// Events fanned out to every session joined to a conversation room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RoomEvent {
    NewMessage(Message),
    MessageRead {
        conversation_id: Uuid,
        user_id: Uuid,
        message_ids: Vec<Uuid>,
    },
    Typing {
        conversation_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },
    NewOffer(Offer),
    OfferUpdated(Offer),
    PaymentPrompt(PaymentPrompt),
}

/// Prompt shown to the brand once a brand-to-creator offer is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentPrompt {
    pub offer_id: Uuid,
    pub conversation_id: Uuid,
    pub brand_id: Uuid,
    #[schema(value_type = String, example = "500.00")]
    pub amount: Decimal,
    pub currency: String,
    pub checkout_reference: Option<String>,
    pub call_to_action: String,
}

impl RoomEvent {
    pub fn conversation_id(&self) -> Uuid {
        match self {
            RoomEvent::NewMessage(message) => message.conversation_id,
            RoomEvent::MessageRead {
                conversation_id, ..
            }
            | RoomEvent::Typing {
                conversation_id, ..
            } => *conversation_id,
            RoomEvent::NewOffer(offer) | RoomEvent::OfferUpdated(offer) => offer.conversation_id,
            RoomEvent::PaymentPrompt(prompt) => prompt.conversation_id,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            RoomEvent::NewMessage(_) => "new_message",
            RoomEvent::MessageRead { .. } => "message_read",
            RoomEvent::Typing { .. } => "typing",
            RoomEvent::NewOffer(_) => "new_offer",
            RoomEvent::OfferUpdated(_) => "offer_updated",
            RoomEvent::PaymentPrompt(_) => "payment_prompt",
        }
    }
}
