use crate::domain::RoomEvent;

/// Seam through which services emit realtime events. Delivery is
/// best-effort; callers never wait on or fail because of it.
pub trait RoomPublisher: Send + Sync {
    /// Returns how many sessions the event was handed to.
    fn publish(&self, event: &RoomEvent) -> usize;
}

/// Publisher for contexts without a realtime layer (jobs, tooling).
pub struct NoopPublisher;

impl RoomPublisher for NoopPublisher {
    fn publish(&self, _event: &RoomEvent) -> usize {
        0
    }
}
