use actix_cors::Cors;

use crate::config::SecurityConfig;

/// Exact-match origin allowlist; websocket upgrades pass through the same check.
pub fn cors_middleware(config: &SecurityConfig) -> Cors {
    let allowlist = config.cors_allowed_origins.clone();

    Cors::default()
        .supports_credentials()
        .allow_any_header()
        .expose_headers(vec!["x-request-id"])
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_origin_fn(move |origin, _| {
            origin
                .to_str()
                .is_ok_and(|value| allowlist.iter().any(|allowed| allowed == value))
        })
        .max_age(3600)
}
