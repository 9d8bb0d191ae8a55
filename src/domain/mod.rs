pub mod conversation;
pub mod errors;
pub mod events;
pub mod message;
pub mod offer;
pub mod user;

pub use conversation::{participant_pair, Conversation, LastMessage};
pub use errors::{DomainError, FieldViolation};
pub use events::{PaymentPrompt, RoomEvent};
pub use message::{next_sent_at, Attachment, Message, MessageType};
pub use offer::{CounterTerms, Offer, OfferAction, OfferDraft, OfferStatus, OfferType};
pub use user::{Actor, Role};
