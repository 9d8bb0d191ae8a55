pub mod common;
pub mod conversation_dto;
pub mod message_dto;
pub mod offer_dto;

pub use common::*;
pub use conversation_dto::*;
pub use message_dto::*;
pub use offer_dto::*;
