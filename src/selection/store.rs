//! Persisted selection store.
//!
//! Setters write through to storage before observers hear about the change,
//! so a restart always restores the last explicit selection. Narrower keys
//! are cleared before the broader key is written: if a write fails midway,
//! storage still holds a selection that satisfies the cascade rule.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use super::{normalize_id, option_value, Selection, SelectionStorage, AGENT_KEY, LANDLORD_KEY, PROPERTY_KEY};
use crate::event_bus::{ConsoleEvent, EventBus};

/// A scope transition, delivered to observers after it is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChange {
    pub before: Selection,
    pub after: Selection,
}

impl ScopeChange {
    pub fn agent_changed(&self) -> bool {
        self.before.agent_id != self.after.agent_id
    }

    pub fn landlord_changed(&self) -> bool {
        self.before.landlord_id != self.after.landlord_id
    }

    pub fn property_changed(&self) -> bool {
        self.before.property_id != self.after.property_id
    }
}

/// Anything that must react synchronously to a scope change
pub trait ScopeObserver: Send + Sync {
    fn scope_changed(&self, change: &ScopeChange);
}

pub struct SelectionStore {
    selection: Selection,
    storage: Arc<dyn SelectionStorage>,
    observers: Vec<Arc<dyn ScopeObserver>>,
    events: Option<Arc<EventBus>>,
}

impl SelectionStore {
    /// Restore the selection persisted in `storage`
    pub fn load(storage: Arc<dyn SelectionStorage>) -> Self {
        let selection = Selection {
            agent_id: normalize_id(storage.get(AGENT_KEY).as_deref()),
            landlord_id: normalize_id(storage.get(LANDLORD_KEY).as_deref()),
            property_id: normalize_id(storage.get(PROPERTY_KEY).as_deref()),
        };
        debug!("Selection restored: {}", selection);

        Self {
            selection,
            storage,
            observers: Vec::new(),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Register an observer for every future scope change
    pub fn subscribe(&mut self, observer: Arc<dyn ScopeObserver>) {
        self.observers.push(observer);
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.selection.agent_id.as_deref()
    }

    pub fn landlord_id(&self) -> Option<&str> {
        self.selection.landlord_id.as_deref()
    }

    pub fn property_id(&self) -> Option<&str> {
        self.selection.property_id.as_deref()
    }

    /// Select an agent. A different agent resets landlord and property.
    pub fn set_agent_id(&mut self, id: Option<&str>) -> Result<()> {
        let id = normalize_id(id);
        let mut next = self.selection.clone();

        if id != self.selection.agent_id {
            self.storage.remove(PROPERTY_KEY)?;
            self.storage.remove(LANDLORD_KEY)?;
            next.property_id = None;
            next.landlord_id = None;
        }
        persist(self.storage.as_ref(), AGENT_KEY, id.as_deref())?;
        next.agent_id = id;

        self.commit(next);
        Ok(())
    }

    /// Select a landlord. A different landlord resets the property.
    pub fn set_landlord_id(&mut self, id: Option<&str>) -> Result<()> {
        let id = normalize_id(id);
        let mut next = self.selection.clone();

        if id != self.selection.landlord_id {
            self.storage.remove(PROPERTY_KEY)?;
            next.property_id = None;
        }
        persist(self.storage.as_ref(), LANDLORD_KEY, id.as_deref())?;
        next.landlord_id = id;

        self.commit(next);
        Ok(())
    }

    pub fn set_property_id(&mut self, id: Option<&str>) -> Result<()> {
        let id = normalize_id(id);
        persist(self.storage.as_ref(), PROPERTY_KEY, id.as_deref())?;

        let mut next = self.selection.clone();
        next.property_id = id;
        self.commit(next);
        Ok(())
    }

    /// Apply a landlord selector value; `"all"` clears the landlord
    pub fn select_landlord_option(&mut self, value: &str) -> Result<()> {
        self.set_landlord_id(option_value(value))
    }

    /// Apply a property selector value; `"all"` clears the property
    pub fn select_property_option(&mut self, value: &str) -> Result<()> {
        self.set_property_id(option_value(value))
    }

    /// Forget the whole selection, in memory and in storage
    pub fn clear_filters(&mut self) -> Result<()> {
        self.storage.remove(PROPERTY_KEY)?;
        self.storage.remove(LANDLORD_KEY)?;
        self.storage.remove(AGENT_KEY)?;

        self.commit(Selection::default());
        Ok(())
    }

    fn commit(&mut self, next: Selection) {
        if next == self.selection {
            return;
        }

        let before = std::mem::replace(&mut self.selection, next);
        let change = ScopeChange { before, after: self.selection.clone() };
        info!("Scope changed: {} -> {}", change.before, change.after);

        for observer in &self.observers {
            observer.scope_changed(&change);
        }
        if let Some(bus) = &self.events {
            bus.publish(ConsoleEvent::ScopeChanged {
                before: change.before,
                after: change.after,
            });
        }
    }
}

fn persist(storage: &dyn SelectionStorage, key: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => storage.set(key, v),
        None => storage.remove(key),
    }
}
