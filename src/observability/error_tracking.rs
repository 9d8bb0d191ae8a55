use tracing::error;
use uuid::Uuid;

/// Records an unexpected server error with an event id operators can quote.
/// Statuses below 500 are not captured.
pub fn capture_unexpected_5xx(
    path: &str,
    method: &str,
    status: u16,
    request_id: &str,
) -> Option<Uuid> {
    if status < 500 {
        return None;
    }

    let event_id = Uuid::new_v4();
    error!(
        tracking_backend = "log",
        event_id = %event_id,
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status,
        "unexpected server error captured"
    );
    Some(event_id)
}
