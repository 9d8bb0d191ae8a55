use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::NotificationsConfig;
use crate::domain::OfferStatus;
use crate::error::{AppError, AppResult};

/// Side-channel job (email/push) handed to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationJob {
    NewMessage {
        recipient_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
        preview: String,
    },
    OfferActivity {
        recipient_id: Uuid,
        conversation_id: Uuid,
        offer_id: Uuid,
        status: OfferStatus,
    },
}

impl NotificationJob {
    pub fn recipient_id(&self) -> Uuid {
        match self {
            NotificationJob::NewMessage { recipient_id, .. }
            | NotificationJob::OfferActivity { recipient_id, .. } => *recipient_id,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            NotificationJob::NewMessage { .. } => "new_message",
            NotificationJob::OfferActivity { .. } => "offer_activity",
        }
    }
}

/// Fire-and-forget: implementations must not block or report failures back.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, job: NotificationJob);
}

pub struct LogNotificationDispatcher;

impl NotificationDispatcher for LogNotificationDispatcher {
    fn dispatch(&self, job: NotificationJob) {
        info!(
            kind = job.kind(),
            recipient_id = %job.recipient_id(),
            "notification job queued"
        );
    }
}

pub struct WebhookNotificationDispatcher {
    webhook_url: String,
    client: Client,
}

impl WebhookNotificationDispatcher {
    pub fn new(config: &NotificationsConfig) -> AppResult<Self> {
        let webhook_url = config.webhook_url.clone().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("notifications webhook_url not configured"))
        })?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("notification client: {e}")))?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

impl NotificationDispatcher for WebhookNotificationDispatcher {
    fn dispatch(&self, job: NotificationJob) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(kind = job.kind(), "no runtime available, notification dropped");
            return;
        };

        let client = self.client.clone();
        let url = self.webhook_url.clone();
        runtime.spawn(async move {
            match client.post(&url).json(&job).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(kind = job.kind(), "notification delivered");
                }
                Ok(response) => {
                    warn!(
                        kind = job.kind(),
                        status = %response.status(),
                        "notification webhook rejected job"
                    );
                }
                Err(error) => {
                    warn!(kind = job.kind(), error = %error, "notification webhook unreachable");
                }
            }
        });
    }
}
