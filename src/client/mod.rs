//! Client-side session logic: REST access, realtime frames and the local
//! reconciliation of a conversation timeline.

pub mod api;
pub mod realtime;
pub mod session;
pub mod timeline;
pub mod typing;
pub mod unread;

pub use api::{ClientError, HttpMessagingApi, MessagingApi, OfferCommand, RetryPolicy};
pub use realtime::{ChannelRealtimeLink, RealtimeLink};
pub use session::ConversationSession;
pub use timeline::{merge_timeline, PendingMessage, TimelineItem};
pub use typing::TypingIndicator;
pub use unread::{total_unread, UnreadBadge};
