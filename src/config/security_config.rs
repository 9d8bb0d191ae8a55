use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    #[serde(default = "crate::config::defaults::default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "crate::config::defaults::default_metrics_allow_private_only")]
    pub metrics_allow_private_only: bool,
    #[serde(default)]
    pub metrics_admin_token: Option<String>,
    #[serde(default = "crate::config::defaults::default_global_rate_limit_per_minute")]
    pub global_rate_limit_per_minute: u32,
    #[serde(default = "crate::config::defaults::default_global_rate_limit_burst_size")]
    pub global_rate_limit_burst_size: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        use crate::config::defaults;

        Self {
            cors_allowed_origins: defaults::default_cors_allowed_origins(),
            metrics_allow_private_only: defaults::default_metrics_allow_private_only(),
            metrics_admin_token: None,
            global_rate_limit_per_minute: defaults::default_global_rate_limit_per_minute(),
            global_rate_limit_burst_size: defaults::default_global_rate_limit_burst_size(),
        }
    }
}
