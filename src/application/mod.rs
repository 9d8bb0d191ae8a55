mod conversation_service;
mod events;
mod message_service;
mod offer_service;

pub use conversation_service::ConversationService;
pub use events::{NoopPublisher, RoomPublisher};
pub use message_service::MessageService;
pub use offer_service::OfferService;
