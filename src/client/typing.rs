use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_secs(2);

/// Debounces local keystrokes into `is_typing` transitions. The caller owns
/// the clock, so the state machine stays synchronous.
#[derive(Debug, Clone)]
pub struct TypingIndicator {
    idle_timeout: Duration,
    last_keystroke: Option<Instant>,
}

impl Default for TypingIndicator {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_IDLE)
    }
}

impl TypingIndicator {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            last_keystroke: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.last_keystroke.is_some()
    }

    /// `Some(true)` on the first keystroke of a burst.
    pub fn on_keystroke(&mut self, now: Instant) -> Option<bool> {
        let started = self.last_keystroke.is_none();
        self.last_keystroke = Some(now);
        started.then_some(true)
    }

    /// `Some(false)` once the idle timeout has passed since the last keystroke.
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        let last = self.last_keystroke?;
        if now.saturating_duration_since(last) >= self.idle_timeout {
            self.last_keystroke = None;
            Some(false)
        } else {
            None
        }
    }

    /// Sending a message ends the burst immediately.
    pub fn on_send(&mut self) -> Option<bool> {
        self.last_keystroke.take().map(|_| false)
    }

    /// When the next `poll` could emit, if a burst is active.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_keystroke.map(|last| last + self.idle_timeout)
    }
}
