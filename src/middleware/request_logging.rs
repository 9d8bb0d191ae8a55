use actix_web::dev::ServiceRequest;
use actix_web::http::header::HeaderValue;
use tracing::{info, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuses a caller-supplied request id when it is a sane token, so traces can
/// be followed across the client and the service.
pub fn request_id(req: &ServiceRequest) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| is_valid_request_id(value))
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn is_valid_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 128
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn header_value(request_id: &str) -> HeaderValue {
    HeaderValue::from_str(request_id)
        .unwrap_or_else(|_| HeaderValue::from_static("invalid-request-id"))
}

/// Respects forwarded headers only as far as actix's `realip_remote_addr` does.
pub fn client_ip(req: &ServiceRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "unknown",
    }
}

pub struct CompletedRequest<'a> {
    pub request_id: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub client_ip: &'a str,
    pub status: u16,
    pub latency_ms: u64,
}

pub fn log_completed(request: &CompletedRequest<'_>) {
    if request.status >= 500 {
        warn!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            client_ip = %request.client_ip,
            status = request.status,
            status_class = status_class(request.status),
            latency_ms = request.latency_ms,
            "request completed"
        );
    } else {
        info!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            client_ip = %request.client_ip,
            status = request.status,
            status_class = status_class(request.status),
            latency_ms = request.latency_ms,
            "request completed"
        );
    }
}
