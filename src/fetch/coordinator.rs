//! Fetch Coordinator
//!
//! Caches responses by query key, shares one in-flight request between every
//! caller asking for the same key, and serves stale data while revalidating.
//!
//! Each request is tagged with a generation. Only the request currently
//! registered as in flight for its key may write the cache; anything it
//! superseded (invalidation, cancellation, a forced refetch) is discarded on
//! arrival.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, EntrySnapshot, FetchStatus};
use super::FetchError;
use crate::event_bus::{ConsoleEvent, EventBus};
use crate::query::QueryKey;
use crate::selection::{ScopeChange, ScopeObserver};

type SharedLoad<D> = Shared<BoxFuture<'static, Result<D, FetchError>>>;

struct InFlight<D> {
    generation: u64,
    load: SharedLoad<D>,
}

/// Entries kept before the least useful ones are evicted
pub const DEFAULT_CAPACITY: usize = 256;

struct CacheState<D> {
    entries: HashMap<QueryKey, CacheEntry<D>>,
    in_flight: HashMap<QueryKey, InFlight<D>>,
    next_generation: u64,
    clock: u64,
    capacity: usize,
}

impl<D> CacheState<D> {
    fn touch(&mut self, key: &QueryKey) {
        self.clock += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_used = self.clock;
        }
    }

    /// Drop entries beyond capacity: stale ones first, then the least
    /// recently used. Keys with a request in flight are kept.
    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(key, _)| !self.in_flight.contains_key(*key))
                .min_by_key(|(_, entry)| (!entry.stale, entry.last_used))
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    debug!("Evicting {}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

pub struct FetchCoordinator<D> {
    state: Arc<Mutex<CacheState<D>>>,
    events: Option<Arc<EventBus>>,
}

impl<D> Clone for FetchCoordinator<D> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }
}

impl<D> FetchCoordinator<D>
where
    D: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                next_generation: 0,
                clock: 0,
                capacity: DEFAULT_CAPACITY,
            })),
            events: None,
        }
    }

    /// Keep at most `capacity` entries (at least one)
    pub fn with_capacity(self, capacity: usize) -> Self {
        {
            let mut state = self.lock();
            state.capacity = capacity.max(1);
            state.evict();
        }
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Fetch `key`, calling `loader` only when nothing usable is cached or
    /// in flight.
    ///
    /// A stale entry is returned immediately while `loader` refreshes it in
    /// the background. `loader` runs with the cache locked and must only
    /// build its future, not touch the coordinator.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, loader: F) -> Result<D, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<D, FetchError>> + Send + 'static,
    {
        let load = {
            let mut state = self.lock();

            if let Some(data) = state.entries.get(key).and_then(CacheEntry::fresh).cloned() {
                debug!("Cache hit for {}", key);
                state.touch(key);
                return Ok(data);
            }
            state.touch(key);

            let load = match state.in_flight.get(key) {
                Some(flight) => {
                    debug!(generation = flight.generation, "Joining in-flight request for {}", key);
                    flight.load.clone()
                }
                None => self.start(&mut state, key, loader().boxed()),
            };

            if let Some(stale) = state.entries.get(key).and_then(|e| e.data.clone()) {
                debug!("Serving stale data for {} while revalidating", key);
                return Ok(stale);
            }
            load
        };

        load.await
    }

    /// Issue a new request for `key` even if cached data is fresh, and wait
    /// for it. Any request already in flight for the key is superseded.
    pub async fn refetch<F, Fut>(&self, key: &QueryKey, loader: F) -> Result<D, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<D, FetchError>> + Send + 'static,
    {
        let load = {
            let mut state = self.lock();
            self.start(&mut state, key, loader().boxed())
        };
        load.await
    }

    /// Wait for the request in flight for `key`, if there is one
    pub async fn settled(&self, key: &QueryKey) {
        let load = self.lock().in_flight.get(key).map(|f| f.load.clone());
        if let Some(load) = load {
            let _ = load.await;
        }
    }

    /// Mark every entry matching `predicate` stale. Requests in flight for
    /// those keys were issued before the invalidation and are detached.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut state = self.lock();

        let mut count = 0;
        for (key, entry) in state.entries.iter_mut() {
            if predicate(key) {
                entry.stale = true;
                count += 1;
            }
        }

        let detached: Vec<QueryKey> = state.in_flight.keys().filter(|&k| predicate(k)).cloned().collect();
        for key in &detached {
            Self::detach(&mut state, key);
        }

        count
    }

    pub fn invalidate_all(&self) -> usize {
        let count = self.invalidate(|_| true);
        info!("Invalidated {} cache entries", count);
        self.publish(ConsoleEvent::CacheInvalidated { entries: count });
        count
    }

    /// Invalidate every key of one resource, whatever its scope and filters
    pub fn invalidate_resource(&self, path: &str) -> usize {
        let target = QueryKey::resource(path);
        let count = self.invalidate(|key| key.resource_path() == target.resource_path());
        debug!("Invalidated {} entries of {}", count, target.resource_path());
        count
    }

    /// Stop waiting for `key`: its in-flight response will be ignored.
    pub fn cancel(&self, key: &QueryKey) -> bool {
        let mut state = self.lock();
        Self::detach(&mut state, key)
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<EntrySnapshot<D>> {
        let state = self.lock();
        let is_fetching = state.in_flight.contains_key(key);
        state.entries.get(key).map(|entry| EntrySnapshot::of(entry, is_fetching))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start(&self, state: &mut CacheState<D>, key: &QueryKey, request: BoxFuture<'static, Result<D, FetchError>>) -> SharedLoad<D> {
        state.next_generation += 1;
        let generation = state.next_generation;
        debug!(generation, "Fetching {}", key);

        let coordinator = self.clone();
        let settle_key = key.clone();
        let load = async move {
            let result = request.await;
            coordinator.settle(&settle_key, generation, result.clone());
            result
        }
        .boxed()
        .shared();

        state.in_flight.insert(key.clone(), InFlight { generation, load: load.clone() });
        let entry = state.entries.entry(key.clone()).or_insert_with(CacheEntry::pending);
        if entry.data.is_none() {
            entry.status = FetchStatus::Pending;
        }
        state.touch(key);
        state.evict();

        // Drive the request even if every caller stops waiting
        let driver = load.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });

        load
    }

    fn settle(&self, key: &QueryKey, generation: u64, result: Result<D, FetchError>) {
        let success = result.is_ok();
        {
            let mut state = self.lock();
            if state.in_flight.get(key).map(|f| f.generation) != Some(generation) {
                drop(state);
                debug!(generation, "Discarding superseded response for {}", key);
                self.publish(ConsoleEvent::FetchDiscarded { key: key.to_string() });
                return;
            }
            state.in_flight.remove(key);

            let entry = state.entries.entry(key.clone()).or_insert_with(CacheEntry::pending);
            match result {
                Ok(data) => entry.succeed(data, generation),
                Err(err) => {
                    if entry.data.is_some() {
                        warn!("Refresh of {} failed, keeping last known data: {}", key, err);
                    } else {
                        warn!("Fetch of {} failed: {}", key, err);
                    }
                    entry.fail(err);
                }
            }
        }
        self.publish(ConsoleEvent::FetchSettled { key: key.to_string(), success });
    }

    /// Forget the in-flight request for `key`. An entry that never received
    /// data goes with it, so it is not left pending forever.
    fn detach(state: &mut CacheState<D>, key: &QueryKey) -> bool {
        let Some(flight) = state.in_flight.remove(key) else {
            return false;
        };
        debug!(generation = flight.generation, "Detached in-flight request for {}", key);
        if state
            .entries
            .get(key)
            .is_some_and(|e| e.data.is_none() && e.status == FetchStatus::Pending)
        {
            state.entries.remove(key);
        }
        true
    }

    fn publish(&self, event: ConsoleEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D> Default for FetchCoordinator<D>
where
    D: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Every key embeds the scope, so a scope change invalidates the whole cache
impl<D> ScopeObserver for FetchCoordinator<D>
where
    D: Clone + Send + Sync + 'static,
{
    fn scope_changed(&self, change: &ScopeChange) {
        debug!("Scope changed to {}, invalidating cache", change.after);
        self.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{build_key, LocalFilters};
    use crate::selection::{MemoryStorage, Role, SelectionStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn key(path: &str) -> QueryKey {
        QueryKey::resource(path)
    }

    fn counting(calls: &Arc<AtomicUsize>, value: &str) -> impl FnOnce() -> BoxFuture<'static, Result<String, FetchError>> {
        let calls = calls.clone();
        let value = value.to_string();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    async fn until_fetching(c: &FetchCoordinator<String>, key: &QueryKey) {
        for _ in 0..100 {
            if c.snapshot(key).is_some_and(|s| s.is_fetching) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("request for {} never started", key);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_loader() {
        let c = FetchCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let k = key("/api/properties");

        assert_eq!(c.fetch(&k, counting(&calls, "a")).await.unwrap(), "a");
        assert_eq!(c.fetch(&k, counting(&calls, "b")).await.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let snap = c.snapshot(&k).unwrap();
        assert_eq!(snap.status, FetchStatus::Success);
        assert!(snap.last_fetched_at.is_some());
        assert!(!snap.is_fetching);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let c = FetchCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let k = key("/api/tenants");

        let (a, b) = tokio::join!(c.fetch(&k, counting(&calls, "x")), c.fetch(&k, counting(&calls, "y")));
        assert_eq!(a.unwrap(), "x");
        assert_eq!(b.unwrap(), "x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all_serves_stale_then_revalidates() {
        let c = FetchCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let k = key("/api/invoices");
        c.fetch(&k, counting(&calls, "old")).await.unwrap();

        assert_eq!(c.invalidate_all(), 1);
        assert_eq!(c.fetch(&k, counting(&calls, "new")).await.unwrap(), "old");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(c.snapshot(&k).unwrap().is_fetching);

        c.settled(&k).await;
        let snap = c.snapshot(&k).unwrap();
        assert_eq!(snap.data.as_deref(), Some("new"));
        assert!(!snap.stale);
        assert_eq!(c.fetch(&k, counting(&calls, "newer")).await.unwrap(), "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_good() {
        let c = FetchCoordinator::new();
        let k = key("/api/payments");
        c.fetch(&k, || async { Ok("good".to_string()) }).await.unwrap();
        c.invalidate_all();

        let served = c
            .fetch(&k, || async { Err(FetchError::Transport("connection reset".into())) })
            .await
            .unwrap();
        assert_eq!(served, "good");
        c.settled(&k).await;

        let snap = c.snapshot(&k).unwrap();
        assert_eq!(snap.status, FetchStatus::Success);
        assert_eq!(snap.data.as_deref(), Some("good"));
        assert!(snap.stale);
        assert_eq!(snap.error, Some(FetchError::Transport("connection reset".into())));
    }

    #[tokio::test]
    async fn test_failure_without_data_is_retried() {
        let c: FetchCoordinator<String> = FetchCoordinator::new();
        let k = key("/api/units");

        let err = c
            .fetch(&k, || async { Err(FetchError::Status { status: 500, url: "/api/units".into() }) })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        assert_eq!(c.snapshot(&k).unwrap().status, FetchStatus::Error);

        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(c.fetch(&k, counting(&calls, "units")).await.unwrap(), "units");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.snapshot(&k).unwrap().error, None);
    }

    #[tokio::test]
    async fn test_superseded_response_is_discarded() {
        let c = FetchCoordinator::new();
        let k = key("/api/leases");
        let (tx, rx) = oneshot::channel::<String>();

        let first = {
            let c = c.clone();
            let k = k.clone();
            tokio::spawn(async move {
                c.fetch(&k, move || async move {
                    rx.await.map_err(|_| FetchError::Transport("dropped".into()))
                })
                .await
            })
        };
        until_fetching(&c, &k).await;

        c.invalidate_all();
        let fresh = c.fetch(&k, || async { Ok("new".to_string()) }).await.unwrap();
        assert_eq!(fresh, "new");

        tx.send("old".to_string()).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), "old");
        assert_eq!(c.snapshot(&k).unwrap().data.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_cancelled_request_leaves_no_trace() {
        let c = FetchCoordinator::new();
        let k = key("/api/bills");
        let (tx, rx) = oneshot::channel::<String>();

        let waiter = {
            let c = c.clone();
            let k = k.clone();
            tokio::spawn(async move {
                c.fetch(&k, move || async move {
                    rx.await.map_err(|_| FetchError::Transport("dropped".into()))
                })
                .await
            })
        };
        until_fetching(&c, &k).await;

        assert!(c.cancel(&k));
        assert!(!c.cancel(&k));
        tx.send("late".to_string()).unwrap();
        waiter.await.unwrap().unwrap();

        assert!(c.snapshot(&k).is_none());
    }

    #[tokio::test]
    async fn test_invalidate_resource_is_scoped_to_resource() {
        let c = FetchCoordinator::new();
        let tenants = build_key("/api/tenants", &Default::default(), Role::Admin, &LocalFilters::new().search("a"));
        let units = key("/api/units");
        c.fetch(&tenants, || async { Ok("t".to_string()) }).await.unwrap();
        c.fetch(&units, || async { Ok("u".to_string()) }).await.unwrap();

        assert_eq!(c.invalidate_resource("/api/tenants/"), 1);
        assert!(c.snapshot(&tenants).unwrap().stale);
        assert!(!c.snapshot(&units).unwrap().stale);
    }

    #[tokio::test]
    async fn test_refetch_bypasses_fresh_cache() {
        let c = FetchCoordinator::new();
        let k = key("/api/settings/invoice");
        c.fetch(&k, || async { Ok("v1".to_string()) }).await.unwrap();

        let v2 = c.refetch(&k, || async { Ok("v2".to_string()) }).await.unwrap();
        assert_eq!(v2, "v2");
        assert_eq!(c.snapshot(&k).unwrap().data.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_scope_change_invalidates_cache() {
        let c: FetchCoordinator<String> = FetchCoordinator::new();
        let mut store = SelectionStore::load(Arc::new(MemoryStorage::new()));
        store.subscribe(Arc::new(c.clone()));

        let k = key("/api/landlords");
        c.fetch(&k, || async { Ok("list".to_string()) }).await.unwrap();

        store.set_landlord_id(Some("L1")).unwrap();
        assert!(c.snapshot(&k).unwrap().stale);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let c: FetchCoordinator<String> = FetchCoordinator::new().with_capacity(2);
        let (a, b, d) = (key("/api/a"), key("/api/b"), key("/api/d"));

        c.fetch(&a, || async { Ok("a".to_string()) }).await.unwrap();
        c.fetch(&b, || async { Ok("b".to_string()) }).await.unwrap();
        c.fetch(&a, || async { Ok("unused".to_string()) }).await.unwrap();
        c.fetch(&d, || async { Ok("d".to_string()) }).await.unwrap();

        assert_eq!(c.len(), 2);
        assert!(c.snapshot(&a).is_some());
        assert!(c.snapshot(&b).is_none());
        assert!(c.snapshot(&d).is_some());
    }

    #[tokio::test]
    async fn test_stale_entries_are_evicted_first() {
        let c: FetchCoordinator<String> = FetchCoordinator::new().with_capacity(2);
        let (a, b, d) = (key("/api/a"), key("/api/b"), key("/api/d"));

        c.fetch(&a, || async { Ok("a".to_string()) }).await.unwrap();
        c.fetch(&b, || async { Ok("b".to_string()) }).await.unwrap();
        c.invalidate_resource("/api/b");
        c.fetch(&d, || async { Ok("d".to_string()) }).await.unwrap();

        assert!(c.snapshot(&a).is_some());
        assert!(c.snapshot(&b).is_none());
    }

    #[tokio::test]
    async fn test_distinct_searches_stay_bounded() {
        let c: FetchCoordinator<String> = FetchCoordinator::new().with_capacity(8);
        for i in 0..50 {
            let k = build_key(
                "/api/tenants",
                &Default::default(),
                Role::Admin,
                &LocalFilters::new().search(format!("name-{}", i)),
            );
            c.fetch(&k, || async { Ok("t".to_string()) }).await.unwrap();
        }
        assert_eq!(c.len(), 8);
    }

    #[tokio::test]
    async fn test_in_flight_entry_is_never_evicted() {
        let c: FetchCoordinator<String> = FetchCoordinator::new().with_capacity(1);
        let slow = key("/api/slow");
        let (tx, rx) = oneshot::channel::<String>();

        let waiter = {
            let c = c.clone();
            let slow = slow.clone();
            tokio::spawn(async move {
                c.fetch(&slow, move || async move {
                    rx.await.map_err(|_| FetchError::Transport("dropped".into()))
                })
                .await
            })
        };
        until_fetching(&c, &slow).await;

        c.fetch(&key("/api/quick"), || async { Ok("q".to_string()) }).await.unwrap();
        assert!(c.snapshot(&slow).unwrap().is_fetching);

        tx.send("done".to_string()).unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), "done");
        assert_eq!(c.snapshot(&slow).unwrap().data.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_settle_publishes_event() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let c: FetchCoordinator<String> = FetchCoordinator::new().with_event_bus(bus);
        let k = key("/api/receipts");

        c.fetch(&k, || async { Ok("r".to_string()) }).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ConsoleEvent::FetchSettled { key: "[/api/receipts]".into(), success: true }
        );
    }
}
