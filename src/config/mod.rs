pub mod auth_config;
pub mod database_config;
pub mod defaults;
pub mod messaging_config;
pub mod security_config;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;

pub use auth_config::AuthConfig;
pub use database_config::DatabaseConfig;
pub use messaging_config::{MessagingConfig, NegotiationConfig, NotificationsConfig, PaymentConfig};
pub use security_config::SecurityConfig;

const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {section} configuration: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(section: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            section,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "defaults::default_host")]
    pub host: String,
    #[serde(default = "defaults::default_port")]
    pub port: u16,
    #[serde(default = "defaults::default_environment")]
    pub environment: String,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "defaults::default_logging_level")]
    pub level: String,
    #[serde(default = "defaults::default_logging_json_format")]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::default_logging_level(),
            json_format: defaults::default_logging_json_format(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<figment::Error>> {
        let mut config: Self = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Toml::file("config/development.toml").nested())
            .merge(Env::prefixed("APP_").split("__"))
            .merge(
                Env::raw()
                    .only(&[
                        "DATABASE_URL",
                        "JWT_SECRET",
                        "PAYMENT_CHECKOUT_URL",
                        "NOTIFICATIONS_WEBHOOK_URL",
                    ])
                    .map(|key| match key.as_str() {
                        "DATABASE_URL" => "database.url".into(),
                        "JWT_SECRET" => "auth.jwt_secret".into(),
                        "PAYMENT_CHECKOUT_URL" => "payment.checkout_url".into(),
                        "NOTIFICATIONS_WEBHOOK_URL" => "notifications.webhook_url".into(),
                        _ => key.into(),
                    }),
            )
            .extract()
            .map_err(Box::new)?;

        config.payment.checkout_url =
            defaults::normalize_optional_string(config.payment.checkout_url);
        config.notifications.webhook_url =
            defaults::normalize_optional_string(config.notifications.webhook_url);
        config.security.metrics_admin_token =
            defaults::normalize_optional_string(config.security.metrics_admin_token);

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let jwt_secret = self.auth.jwt_secret.trim();
        if jwt_secret.is_empty() {
            return Err(ConfigError::invalid(
                "auth",
                "JWT_SECRET must be set via environment variable",
            ));
        }
        if jwt_secret == PLACEHOLDER_JWT_SECRET {
            return Err(ConfigError::invalid(
                "auth",
                "JWT_SECRET must be set to a secure value, not the default placeholder",
            ));
        }
        if self.auth.previous_jwt_secrets.len() != self.auth.previous_jwt_kids.len() {
            return Err(ConfigError::invalid(
                "auth",
                "previous_jwt_secrets and previous_jwt_kids must have the same length",
            ));
        }

        if self.messaging.page_size == 0 {
            return Err(ConfigError::invalid("messaging", "page_size must be positive"));
        }
        if self.negotiation.counter_offer_validity_days <= 0 {
            return Err(ConfigError::invalid(
                "negotiation",
                "counter_offer_validity_days must be positive",
            ));
        }
        if self.negotiation.expiry_sweep_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "negotiation",
                "expiry_sweep_interval_seconds must be positive",
            ));
        }
        if self.security.global_rate_limit_per_minute == 0
            || self.security.global_rate_limit_burst_size == 0
        {
            return Err(ConfigError::invalid(
                "security",
                "global rate limit values must be positive",
            ));
        }

        Ok(())
    }
}
