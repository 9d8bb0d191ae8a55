use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfig, GovernorConfigBuilder,
    PeerIpKeyExtractor,
};

use crate::config::{ConfigError, SecurityConfig};

const MAX_PER_MINUTE: u32 = 60_000;

/// Per-peer-IP limiter applied to the whole app.
pub fn global_rate_limiting(
    config: &SecurityConfig,
) -> Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>, ConfigError> {
    global_rate_limit_config(config).map(|governor_config| Governor::new(&governor_config))
}

/// Validated limiter settings; each server worker builds its own middleware
/// from a clone.
pub fn global_rate_limit_config(
    config: &SecurityConfig,
) -> Result<GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>, ConfigError> {
    let per_minute = config.global_rate_limit_per_minute;
    if per_minute == 0 || per_minute > MAX_PER_MINUTE {
        return Err(ConfigError::Invalid {
            section: "security",
            message: format!(
                "global_rate_limit_per_minute must be within 1..={MAX_PER_MINUTE}, got {per_minute}"
            ),
        });
    }
    if config.global_rate_limit_burst_size == 0 {
        return Err(ConfigError::Invalid {
            section: "security",
            message: "global_rate_limit_burst_size must be greater than 0".to_string(),
        });
    }

    let replenish_ms = u64::from(MAX_PER_MINUTE / per_minute);
    let governor_config = GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms)
        .burst_size(config.global_rate_limit_burst_size)
        .finish()
        .ok_or_else(|| ConfigError::Invalid {
            section: "security",
            message: "rate limiter configuration rejected".to_string(),
        })?;

    Ok(governor_config)
}
