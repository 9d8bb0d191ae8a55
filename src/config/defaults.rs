pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_environment() -> String {
    "development".to_string()
}

pub fn default_db_max_connections() -> u32 {
    10
}

pub fn default_db_min_connections() -> u32 {
    1
}

pub fn default_db_acquire_timeout_seconds() -> u64 {
    5
}

pub fn default_db_idle_timeout_seconds() -> u64 {
    600
}

pub fn default_db_max_lifetime_seconds() -> u64 {
    1800
}

pub fn default_db_statement_timeout_ms() -> u64 {
    5_000
}

pub fn default_jwt_kid() -> String {
    "v1".to_string()
}

pub fn default_jwt_expiration_seconds() -> u64 {
    900
}

pub fn default_cors_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

pub fn default_metrics_allow_private_only() -> bool {
    true
}

pub fn default_global_rate_limit_per_minute() -> u32 {
    300
}

pub fn default_global_rate_limit_burst_size() -> u32 {
    30
}

pub fn default_logging_level() -> String {
    "info".to_string()
}

pub fn default_logging_json_format() -> bool {
    true
}

pub fn default_page_size() -> u32 {
    20
}

pub fn default_max_content_length() -> usize {
    5_000
}

pub fn default_counter_offer_validity_days() -> i64 {
    7
}

pub fn default_expiry_sweep_interval_seconds() -> u64 {
    60
}

pub fn default_collaborator_timeout_ms() -> u64 {
    3_000
}

pub fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
