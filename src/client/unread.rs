use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::dtos::ConversationResponse;

use super::api::{ClientError, MessagingApi};

pub const DEFAULT_UNREAD_POLL: Duration = Duration::from_secs(10);

/// The badge total is derived, never mutated independently.
pub fn total_unread(conversations: &[ConversationResponse]) -> i64 {
    conversations
        .iter()
        .map(|conversation| i64::from(conversation.unread_count))
        .sum()
}

/// Publishes the cross-conversation unread total on a watch channel.
pub struct UnreadBadge {
    api: Arc<dyn MessagingApi>,
    total: watch::Sender<i64>,
}

impl UnreadBadge {
    pub fn new(api: Arc<dyn MessagingApi>) -> (Self, watch::Receiver<i64>) {
        let (total, receiver) = watch::channel(0);
        (Self { api, total }, receiver)
    }

    pub fn current(&self) -> i64 {
        *self.total.borrow()
    }

    /// Recomputes from already-fetched summaries.
    pub fn apply(&self, conversations: &[ConversationResponse]) -> i64 {
        let total = total_unread(conversations);
        self.total.send_if_modified(|current| {
            let changed = *current != total;
            *current = total;
            changed
        });
        total
    }

    /// Re-fetches conversation summaries and republishes the sum.
    pub async fn refresh(&self) -> Result<i64, ClientError> {
        let conversations = self.api.list_conversations().await?;
        Ok(self.apply(&conversations))
    }

    /// Periodic backstop against missed realtime events. Stops once every
    /// receiver is dropped.
    pub fn spawn_poller(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if self.total.is_closed() {
                    debug!("unread badge has no subscribers; poller stopping");
                    break;
                }
                if let Err(error) = self.refresh().await {
                    warn!(error = %error, "unread badge refresh failed");
                }
            }
        })
    }
}
