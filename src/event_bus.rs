//! Console Event Bus
//!
//! Asynchronous pub/sub for cross-component notifications: scope changes,
//! settled fetches and scheduled deletes. Consumers (the console, log sinks)
//! subscribe; producers never block on slow subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::selection::Selection;

/// Console-wide events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ConsoleEvent {
    /// The agent/landlord/property scope changed
    ScopeChanged { before: Selection, after: Selection },
    /// A request settled and was written to the cache
    FetchSettled { key: String, success: bool },
    /// A response arrived for a request that had been superseded
    FetchDiscarded { key: String },
    /// Every cache entry was marked stale
    CacheInvalidated { entries: usize },
    /// A delete was scheduled behind an undo window
    DeleteScheduled { key: String, label: String },
    /// A scheduled delete was undone before it ran
    DeleteUndone { key: String, label: String },
    /// A scheduled delete ran
    DeleteExecuted { key: String },
}

pub struct EventBus {
    tx: broadcast::Sender<ConsoleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: ConsoleEvent) {
        let _ = self.tx.send(event);
    }

    /// Create a new subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(ConsoleEvent::DeleteExecuted { key: "tenant-1".into() });

        assert_eq!(a.recv().await.unwrap(), ConsoleEvent::DeleteExecuted { key: "tenant-1".into() });
        assert_eq!(b.recv().await.unwrap(), ConsoleEvent::DeleteExecuted { key: "tenant-1".into() });
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(ConsoleEvent::CacheInvalidated { entries: 3 });
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ConsoleEvent::FetchSettled { key: "/api/tenants".into(), success: true };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FetchSettled");
        assert_eq!(json["payload"]["success"], true);
    }
}
