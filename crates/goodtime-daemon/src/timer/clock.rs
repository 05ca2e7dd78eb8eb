//! Time sources used by the timer

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Supplies monotonic time for measuring sessions and wall-clock time for stamping them
pub trait TimeProvider: Send + Sync {
    /// Monotonic milliseconds that keep counting while the machine sleeps.
    ///
    /// Readings are persisted, so they must stay comparable across restarts.
    fn elapsed_realtime(&self) -> i64;

    fn now(&self) -> DateTime<Utc>;
}

/// Milliseconds since the Unix epoch that never step backwards within one process.
///
/// Following the wall clock keeps suspend time and earlier runs on the same scale.
/// If the wall clock is set back, readings hold still until it catches up.
pub struct SystemTimeProvider {
    last: AtomicI64,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn elapsed_realtime(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
