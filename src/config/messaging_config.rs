use std::time::Duration;

use serde::Deserialize;

use crate::config::defaults;

#[derive(Debug, Deserialize, Clone)]
pub struct MessagingConfig {
    #[serde(default = "defaults::default_page_size")]
    pub page_size: u32,
    #[serde(default = "defaults::default_max_content_length")]
    pub max_content_length: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::default_page_size(),
            max_content_length: defaults::default_max_content_length(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NegotiationConfig {
    /// Validity window of the offer spawned when a counter is accepted.
    #[serde(default = "defaults::default_counter_offer_validity_days")]
    pub counter_offer_validity_days: i64,
    #[serde(default = "defaults::default_expiry_sweep_interval_seconds")]
    pub expiry_sweep_interval_seconds: u64,
}

impl NegotiationConfig {
    pub fn counter_offer_validity(&self) -> chrono::Duration {
        chrono::Duration::days(self.counter_offer_validity_days)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_seconds)
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            counter_offer_validity_days: defaults::default_counter_offer_validity_days(),
            expiry_sweep_interval_seconds: defaults::default_expiry_sweep_interval_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Payment collaborator endpoint; payment prompts carry no checkout
    /// reference while unset.
    #[serde(default)]
    pub checkout_url: Option<String>,
    #[serde(default = "defaults::default_collaborator_timeout_ms")]
    pub timeout_ms: u64,
}

impl PaymentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            checkout_url: None,
            timeout_ms: defaults::default_collaborator_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "defaults::default_collaborator_timeout_ms")]
    pub timeout_ms: u64,
}

impl NotificationsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: defaults::default_collaborator_timeout_ms(),
        }
    }
}
