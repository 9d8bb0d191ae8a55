use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::dtos::{
    ConversationResponse, CounterOfferRequest, CreateOfferRequest, MarkReadResponse,
    SendMessageRequest, UnreadTotalResponse,
};
use crate::domain::{Message, Offer};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{code} ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        current: Option<Box<Offer>>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Timeouts, connection failures and 503/504 responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout | ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => matches!(*status, 503 | 504),
            ClientError::Decode(_) => false,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Authoritative offer returned with a state error.
    pub fn current_offer(&self) -> Option<&Offer> {
        match self {
            ClientError::Api { current, .. } => current.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClientError::Timeout
        } else if error.is_decode() {
            ClientError::Decode(error.to_string())
        } else {
            ClientError::Transport(error.to_string())
        }
    }
}

/// Offer transitions a client can request. None of them are applied locally
/// before the server confirms.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferCommand {
    Accept,
    Reject,
    Counter(CounterOfferRequest),
    AcceptCounter,
}

impl OfferCommand {
    fn path_segment(&self) -> &'static str {
        match self {
            OfferCommand::Accept => "accept",
            OfferCommand::Reject => "reject",
            OfferCommand::Counter(_) => "counter",
            OfferCommand::AcceptCounter => "accept-counter",
        }
    }
}

#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<ConversationResponse>, ClientError>;
    async fn unread_total(&self) -> Result<i64, ClientError>;
    async fn list_messages(&self, conversation_id: Uuid, page: u32)
        -> Result<Vec<Message>, ClientError>;
    async fn send_message(
        &self,
        conversation_id: Uuid,
        request: &SendMessageRequest,
    ) -> Result<Message, ClientError>;
    async fn mark_read(&self, conversation_id: Uuid) -> Result<MarkReadResponse, ClientError>;
    async fn list_offers(&self, conversation_id: Uuid) -> Result<Vec<Offer>, ClientError>;
    async fn create_offer(&self, request: &CreateOfferRequest) -> Result<Offer, ClientError>;
    async fn offer_action(&self, offer_id: Uuid, command: &OfferCommand)
        -> Result<Offer, ClientError>;
}

/// Exponential backoff for idempotent reads only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    debug!(operation, attempt, delay_ms = delay.as_millis() as u64, error = %error, "retrying read");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    current: Option<Offer>,
}

pub struct HttpMessagingApi {
    base_url: String,
    token: String,
    client: Client,
    retry: RetryPolicy,
}

impl HttpMessagingApi {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api/v1{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn get<T: DeserializeOwned>(&self, operation: &str, path: String) -> Result<T, ClientError> {
        self.retry
            .run(operation, || async {
                decode(self.request(Method::GET, &path).send().await?).await
            })
            .await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: String,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let mut request = self.request(Method::POST, &path);
        if let Some(body) = body {
            request = request.json(body);
        }
        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(ClientError::from);
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ClientError::Api {
            status: status.as_u16(),
            code: parsed.code,
            message: parsed.message,
            current: parsed.current.map(Box::new),
        },
        Err(_) => {
            warn!(status = status.as_u16(), "error response without a structured body");
            ClientError::Api {
                status: status.as_u16(),
                code: "UNKNOWN".to_string(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                current: None,
            }
        }
    }
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    async fn list_conversations(&self) -> Result<Vec<ConversationResponse>, ClientError> {
        self.get("list_conversations", "/conversations".to_string())
            .await
    }

    async fn unread_total(&self) -> Result<i64, ClientError> {
        let body: UnreadTotalResponse = self
            .get("unread_total", "/conversations/unread".to_string())
            .await?;
        Ok(body.total)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        page: u32,
    ) -> Result<Vec<Message>, ClientError> {
        self.get(
            "list_messages",
            format!("/conversations/{conversation_id}/messages?page={page}"),
        )
        .await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        request: &SendMessageRequest,
    ) -> Result<Message, ClientError> {
        self.post(
            format!("/conversations/{conversation_id}/messages"),
            Some(request),
        )
        .await
    }

    async fn mark_read(&self, conversation_id: Uuid) -> Result<MarkReadResponse, ClientError> {
        self.post::<(), _>(format!("/conversations/{conversation_id}/read"), None)
            .await
    }

    async fn list_offers(&self, conversation_id: Uuid) -> Result<Vec<Offer>, ClientError> {
        self.get(
            "list_offers",
            format!("/conversations/{conversation_id}/offers"),
        )
        .await
    }

    async fn create_offer(&self, request: &CreateOfferRequest) -> Result<Offer, ClientError> {
        self.post("/offers".to_string(), Some(request)).await
    }

    async fn offer_action(
        &self,
        offer_id: Uuid,
        command: &OfferCommand,
    ) -> Result<Offer, ClientError> {
        let path = format!("/offers/{offer_id}/{}", command.path_segment());
        match command {
            OfferCommand::Counter(terms) => self.post(path, Some(terms)).await,
            _ => self.post::<(), _>(path, None).await,
        }
    }
}
