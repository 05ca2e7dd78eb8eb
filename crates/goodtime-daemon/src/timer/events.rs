//! Timer events

use goodtime_core::models::TimerType;
use serde::{Deserialize, Serialize};

/// Lifecycle notification emitted by the timer.
///
/// End times are monotonic milliseconds. For count-up sessions they are the synthetic
/// hard-limit deadline, not a real one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Start { auto_started: bool, end_time: i64 },
    Pause,
    AddOneMinute { new_end_time: i64 },
    Finished { timer_type: TimerType, autostart_next_session: bool },
    Reset,
    SendToBackground { is_timer_running: bool, end_time: i64 },
    BringToForeground,
}

/// Receives timer events.
///
/// Called synchronously from within timer commands, in registration order.
/// Implementations must return quickly and must not call back into the timer.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}
