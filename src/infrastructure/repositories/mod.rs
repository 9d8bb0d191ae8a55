mod message_repository;
mod offer_repository;
mod traits;

pub use message_repository::MessageRepositoryImpl;
pub use offer_repository::OfferRepositoryImpl;
pub use traits::{AppendOutcome, MessageRepository, OfferRepository};
