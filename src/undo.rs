//! Undo-able deletes.
//!
//! A destructive action is held back for a short window during which the
//! user can take it back. Scheduling the same key again restarts the window
//! with the new action.

use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::event_bus::{ConsoleEvent, EventBus};

pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

struct PendingDelete {
    id: u64,
    label: String,
    handle: AbortHandle,
}

#[derive(Default)]
struct Pending {
    next_id: u64,
    deletes: HashMap<String, PendingDelete>,
}

pub struct UndoScheduler {
    pending: Arc<Mutex<Pending>>,
    events: Option<Arc<EventBus>>,
}

impl UndoScheduler {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(Pending::default())),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Run `action` after `delay` unless [`undo`](Self::undo) is called first
    pub fn schedule<F, Fut>(&self, key: &str, label: &str, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        pending.next_id += 1;
        let id = pending.next_id;

        let shared = Arc::clone(&self.pending);
        let events = self.events.clone();
        let task_key = key.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let claimed = {
                let mut pending = lock(&shared);
                if pending.deletes.get(&task_key).map(|d| d.id) == Some(id) {
                    pending.deletes.remove(&task_key);
                    true
                } else {
                    false
                }
            };
            if !claimed {
                return;
            }

            match action().await {
                Ok(()) => info!("Scheduled delete of {} ran", task_key),
                Err(e) => warn!("Scheduled delete of {} failed: {:#}", task_key, e),
            }
            if let Some(bus) = events {
                bus.publish(ConsoleEvent::DeleteExecuted { key: task_key });
            }
        });

        let replaced = pending.deletes.insert(
            key.to_string(),
            PendingDelete { id, label: label.to_string(), handle: task.abort_handle() },
        );
        drop(pending);

        if let Some(previous) = replaced {
            previous.handle.abort();
        }
        info!("{} will be deleted in {:?}", label, delay);
        self.publish(ConsoleEvent::DeleteScheduled { key: key.to_string(), label: label.to_string() });
    }

    /// Cancel a pending delete. Returns `false` if nothing was pending.
    pub fn undo(&self, key: &str) -> bool {
        let Some(delete) = lock(&self.pending).deletes.remove(key) else {
            return false;
        };
        delete.handle.abort();
        info!("{} was not deleted", delete.label);
        self.publish(ConsoleEvent::DeleteUndone { key: key.to_string(), label: delete.label });
        true
    }

    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.pending).deletes.contains_key(key)
    }

    fn publish(&self, event: ConsoleEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

impl Default for UndoScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
