use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};

const COLLABORATOR: &str = "payment";

/// Checkout handoff for an accepted offer. The offer id doubles as the
/// idempotency key so repeated initiations resolve to one checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub offer_id: Uuid,
    pub payer_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    checkout_reference: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the collaborator's checkout reference.
    async fn initiate_payment(&self, request: &PaymentRequest) -> AppResult<String>;
}

pub struct DisabledPaymentGateway;

#[async_trait]
impl PaymentGateway for DisabledPaymentGateway {
    async fn initiate_payment(&self, _request: &PaymentRequest) -> AppResult<String> {
        Err(AppError::upstream(
            COLLABORATOR,
            "payment collaborator is not configured",
        ))
    }
}

pub struct HttpPaymentGateway {
    checkout_url: String,
    client: Client,
}

impl HttpPaymentGateway {
    pub fn new(config: &PaymentConfig) -> AppResult<Self> {
        let checkout_url = config.checkout_url.clone().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("payment checkout_url not configured"))
        })?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("payment client: {e}")))?;

        Ok(Self {
            checkout_url,
            client,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initiate_payment(&self, request: &PaymentRequest) -> AppResult<String> {
        let response = self
            .client
            .post(&self.checkout_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header("Idempotency-Key", request.offer_id.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, offer_id = %request.offer_id, "payment initiation request failed");
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    "request could not be sent".to_string()
                };
                AppError::upstream(COLLABORATOR, message)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, offer_id = %request.offer_id, "payment collaborator rejected checkout");
            return Err(AppError::upstream(
                COLLABORATOR,
                format!("checkout rejected with status {status}"),
            ));
        }

        let body = response.json::<CheckoutResponse>().await.map_err(|e| {
            error!(error = %e, "failed to parse payment collaborator response");
            AppError::upstream(COLLABORATOR, "unreadable checkout response")
        })?;
        Ok(body.checkout_reference)
    }
}
