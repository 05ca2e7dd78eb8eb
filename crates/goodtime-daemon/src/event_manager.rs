//! Central event broadcasting

use tokio::sync::broadcast;

use crate::timer::{Event, EventListener};

/// Re-publishes timer events to any number of subscribers
pub struct EventManager {
    event_tx: broadcast::Sender<Event>,
}

impl EventManager {
    /// Create a new event manager with a broadcast channel
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self { event_tx }
    }

    /// Subscribe to all timer events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventListener for EventManager {
    fn on_event(&self, event: &Event) {
        tracing::debug!(
            "EventManager: broadcasting {:?} to {} receivers",
            event,
            self.event_tx.receiver_count()
        );
        self.emit(event.clone());
    }
}
