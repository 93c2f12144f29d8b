//! Console session.
//!
//! Wires the selection store, the fetch coordinator and the API transport
//! together for one signed-in user. The coordinator is subscribed to the
//! store, so every scope change invalidates cached data before the next
//! load is keyed.

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{decode, decode_list, InvoiceSettings, Landlord, Mutation, Property, Transport};
use crate::event_bus::EventBus;
use crate::fetch::{EntrySnapshot, FetchCoordinator, FetchError};
use crate::presentation::timezone::zone_offset_minutes;
use crate::query::{build_key, LocalFilters, QueryKey};
use crate::selection::{self, Role, Selection, SelectionStorage, SelectionStore};
use crate::undo::UndoScheduler;

pub const PROPERTIES_RESOURCE: &str = "/api/properties";
pub const LANDLORDS_RESOURCE: &str = "/api/landlords";
pub const INVOICE_SETTINGS_RESOURCE: &str = "/api/settings/invoice";

/// Resources a mutation on `path` can change: the path itself and every
/// collection above it, stopping at the `/api` root.
///
/// `/api/tenants/abc` gives `["/api/tenants/abc", "/api/tenants"]`.
pub fn affected_resources(path: &str) -> Vec<String> {
    let mut current = path.trim().trim_end_matches('/');
    let mut resources = Vec::new();
    while !current.is_empty() && current != "/api" {
        resources.push(current.to_string());
        match current.rsplit_once('/') {
            Some((parent, _)) => current = parent,
            None => break,
        }
    }
    resources
}

pub struct ConsoleSession {
    store: SelectionStore,
    role: Role,
    cache: FetchCoordinator<Value>,
    transport: Arc<dyn Transport>,
    undo: UndoScheduler,
    events: Arc<EventBus>,
}

impl ConsoleSession {
    pub fn new(storage: Arc<dyn SelectionStorage>, role: Role, transport: Arc<dyn Transport>) -> Self {
        let events = Arc::new(EventBus::new());
        let cache = FetchCoordinator::new().with_event_bus(Arc::clone(&events));

        let mut store = SelectionStore::load(storage).with_event_bus(Arc::clone(&events));
        store.subscribe(Arc::new(cache.clone()));

        info!("Session started as {} with {}", role, store.selection());
        Self {
            store,
            role,
            cache,
            transport,
            undo: UndoScheduler::new().with_event_bus(Arc::clone(&events)),
            events,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn selection(&self) -> &Selection {
        self.store.selection()
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn cache(&self) -> &FetchCoordinator<Value> {
        &self.cache
    }

    pub fn set_agent(&mut self, id: Option<&str>) -> Result<()> {
        self.store.set_agent_id(id)
    }

    /// Select a landlord by selector value (`"all"` clears it)
    pub fn select_landlord(&mut self, value: &str) -> Result<()> {
        self.store.select_landlord_option(value)
    }

    /// Select a property by selector value (`"all"` clears it)
    pub fn select_property(&mut self, value: &str) -> Result<()> {
        self.store.select_property_option(value)
    }

    pub fn clear_filters(&mut self) -> Result<()> {
        self.store.clear_filters()
    }

    /// The key `load` would use for `resource` in the current scope
    pub fn key(&self, resource: &str, filters: &LocalFilters) -> QueryKey {
        build_key(resource, self.store.selection(), self.role, filters)
    }

    pub async fn load(&self, resource: &str, filters: &LocalFilters) -> Result<Value, FetchError> {
        let key = self.key(resource, filters);
        let transport = Arc::clone(&self.transport);
        let request_key = key.clone();
        self.cache
            .fetch(&key, move || async move { transport.get(&request_key).await })
            .await
    }

    /// Bypass the cache and wait for fresh data
    pub async fn reload(&self, resource: &str, filters: &LocalFilters) -> Result<Value, FetchError> {
        let key = self.key(resource, filters);
        let transport = Arc::clone(&self.transport);
        let request_key = key.clone();
        self.cache
            .refetch(&key, move || async move { transport.get(&request_key).await })
            .await
    }

    pub fn snapshot(&self, resource: &str, filters: &LocalFilters) -> Option<EntrySnapshot<Value>> {
        self.cache.snapshot(&self.key(resource, filters))
    }

    /// Invalidate one resource, or everything when `resource` is `None`
    pub fn invalidate(&self, resource: Option<&str>) -> usize {
        match resource {
            Some(path) => self.cache.invalidate_resource(path),
            None => self.cache.invalidate_all(),
        }
    }

    /// Send a mutation, then mark `resources` stale so the next load refetches
    pub async fn mutate(
        &self,
        method: Mutation,
        path: &str,
        body: Option<Value>,
        resources: &[&str],
    ) -> Result<Value, FetchError> {
        let response = self.transport.send(method, path, body).await?;
        let stale: usize = resources.iter().map(|r| self.cache.invalidate_resource(r)).sum();
        info!("{:?} {} ok, {} cached entries now stale", method, path, stale);
        Ok(response)
    }

    /// Delete `path` after the undo window unless [`undo_delete`](Self::undo_delete)
    /// is called first
    pub fn schedule_delete(&self, path: &str, label: &str, delay: Duration, resources: &[&str]) {
        let transport = Arc::clone(&self.transport);
        let cache = self.cache.clone();
        let target = path.to_string();
        let resources: Vec<String> = resources.iter().map(|r| r.to_string()).collect();

        self.undo.schedule(path, label, delay, move || async move {
            transport.send(Mutation::Delete, &target, None).await?;
            for resource in &resources {
                cache.invalidate_resource(resource);
            }
            Ok(())
        });
    }

    pub fn undo_delete(&self, path: &str) -> bool {
        self.undo.undo(path)
    }

    /// Properties visible in the current scope
    pub async fn properties(&self) -> Result<Vec<Property>, FetchError> {
        decode_list(self.load(PROPERTIES_RESOURCE, &LocalFilters::new()).await?)
    }

    pub async fn landlords(&self) -> Result<Vec<Landlord>, FetchError> {
        decode_list(self.load(LANDLORDS_RESOURCE, &LocalFilters::new()).await?)
    }

    /// Bring the selection in line with the properties the user can see
    pub async fn reconcile(&mut self) -> Result<bool> {
        let properties = self.properties().await?;
        selection::reconcile(&mut self.store, self.role, &properties)
    }

    /// Display offset of the selected property; UTC when none is selected
    /// or its settings cannot be read
    pub async fn timezone_offset_minutes(&self) -> i32 {
        if self.store.property_id().is_none() {
            return 0;
        }
        let settings = match self.load(INVOICE_SETTINGS_RESOURCE, &LocalFilters::new()).await {
            Ok(Value::Null) => InvoiceSettings::default(),
            Ok(value) => match decode::<InvoiceSettings>(value) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Unreadable invoice settings: {}", e);
                    InvoiceSettings::default()
                }
            },
            Err(e) => {
                warn!("Could not load invoice settings: {}", e);
                InvoiceSettings::default()
            }
        };
        zone_offset_minutes(&settings.timezone_offset)
    }
}
