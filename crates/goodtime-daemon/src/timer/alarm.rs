//! Alarm for the deadline of the running session.
//!
//! The scheduler only reports that the deadline passed; the owner of the timer reacts
//! by calling `finish()`, which keeps listeners from re-entering the timer.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use super::clock::TimeProvider;
use super::events::{Event, EventListener};

/// The deadline of the running session has been reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmFired;

pub struct AlarmScheduler {
    time: Arc<dyn TimeProvider>,
    fired_tx: mpsc::UnboundedSender<AlarmFired>,
    armed: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl AlarmScheduler {
    /// Create a scheduler bound to the current tokio runtime
    pub fn new(time: Arc<dyn TimeProvider>, fired_tx: mpsc::UnboundedSender<AlarmFired>) -> Self {
        Self {
            time,
            fired_tx,
            armed: Mutex::new(None),
            runtime: Handle::current(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn arm(&self, end_time: i64) {
        let delay = (end_time - self.time.elapsed_realtime()).max(0);
        let delay = Duration::from_millis(u64::try_from(delay).unwrap_or_default());
        tracing::debug!("Arming alarm in {:?}", delay);

        let fired_tx = self.fired_tx.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired_tx.send(AlarmFired);
        });

        let previous = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn disarm(&self) {
        let previous = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            tracing::debug!("Alarm disarmed");
            previous.abort();
        }
    }
}

impl EventListener for AlarmScheduler {
    fn on_event(&self, event: &Event) {
        match event {
            Event::Start { end_time, .. } => self.arm(*end_time),
            Event::AddOneMinute { new_end_time } => {
                // a paused timer has no alarm; resuming arms it again
                if self.is_armed() {
                    self.arm(*new_end_time);
                }
            }
            Event::SendToBackground {
                is_timer_running: true,
                end_time,
            } => self.arm(*end_time),
            Event::Pause | Event::Reset | Event::Finished { .. } => self.disarm(),
            Event::SendToBackground { .. } | Event::BringToForeground => {}
        }
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    struct FrozenClock;

    impl TimeProvider for FrozenClock {
        fn elapsed_realtime(&self) -> i64 {
            1_000
        }

        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    fn scheduler() -> (AlarmScheduler, mpsc::UnboundedReceiver<AlarmFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AlarmScheduler::new(Arc::new(FrozenClock), tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_arms_alarm() {
        let (scheduler, mut rx) = scheduler();

        scheduler.on_event(&Event::Start {
            auto_started: false,
            end_time: 1_000 + 25 * 60_000,
        });
        assert!(scheduler.is_armed());

        let fired = tokio::time::timeout(Duration::from_secs(26 * 60), rx.recv()).await;
        assert_eq!(fired.unwrap(), Some(AlarmFired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_disarms_alarm() {
        let (scheduler, mut rx) = scheduler();

        scheduler.on_event(&Event::Start {
            auto_started: false,
            end_time: 61_000,
        });
        scheduler.on_event(&Event::Pause);
        assert!(!scheduler.is_armed());

        let fired = tokio::time::timeout(Duration::from_secs(120), rx.recv()).await;
        assert!(fired.is_err(), "Alarm should not fire while paused");
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_one_minute_while_paused_keeps_alarm_off() {
        let (scheduler, mut rx) = scheduler();

        scheduler.on_event(&Event::AddOneMinute {
            new_end_time: 61_000,
        });
        assert!(!scheduler.is_armed());

        let fired = tokio::time::timeout(Duration::from_secs(120), rx.recv()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_one_minute_moves_alarm() {
        let (scheduler, mut rx) = scheduler();

        scheduler.on_event(&Event::Start {
            auto_started: false,
            end_time: 61_000,
        });
        scheduler.on_event(&Event::AddOneMinute {
            new_end_time: 121_000,
        });

        let early = tokio::time::timeout(Duration::from_secs(90), rx.recv()).await;
        assert!(early.is_err(), "Alarm should have moved by one minute");

        let fired = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert_eq!(fired.unwrap(), Some(AlarmFired));
    }
}
