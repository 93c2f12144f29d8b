use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Pending,
    Success,
    Error,
}

/// Cache slot for one query key. Owned by the coordinator.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<D> {
    pub data: Option<D>,
    pub status: FetchStatus,
    pub stale: bool,
    pub error: Option<FetchError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Generation of the request that produced `data`
    pub generation: u64,
    /// Coordinator clock value of the last fetch that touched this entry
    pub last_used: u64,
}

impl<D> CacheEntry<D> {
    pub fn pending() -> Self {
        Self {
            data: None,
            status: FetchStatus::Pending,
            stale: false,
            error: None,
            last_fetched_at: None,
            generation: 0,
            last_used: 0,
        }
    }

    /// Data that can be served without waiting for the network
    pub fn fresh(&self) -> Option<&D> {
        match self.status {
            FetchStatus::Success if !self.stale => self.data.as_ref(),
            _ => None,
        }
    }

    pub fn succeed(&mut self, data: D, generation: u64) {
        self.data = Some(data);
        self.status = FetchStatus::Success;
        self.stale = false;
        self.error = None;
        self.last_fetched_at = Some(Utc::now());
        self.generation = generation;
    }

    /// Record a failure; a previous success keeps being served
    pub fn fail(&mut self, error: FetchError) {
        if self.data.is_none() {
            self.status = FetchStatus::Error;
        }
        self.error = Some(error);
    }
}

/// Read-only view of a cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot<D> {
    pub data: Option<D>,
    pub status: FetchStatus,
    pub stale: bool,
    pub is_fetching: bool,
    pub error: Option<FetchError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<D: Clone> EntrySnapshot<D> {
    pub(crate) fn of(entry: &CacheEntry<D>, is_fetching: bool) -> Self {
        Self {
            data: entry.data.clone(),
            status: entry.status,
            stale: entry.stale,
            is_fetching,
            error: entry.error.clone(),
            last_fetched_at: entry.last_fetched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_last_known_good() {
        let mut entry = CacheEntry::pending();
        entry.succeed(vec![1, 2], 1);
        entry.stale = true;

        entry.fail(FetchError::Transport("offline".into()));
        assert_eq!(entry.status, FetchStatus::Success);
        assert_eq!(entry.data, Some(vec![1, 2]));
        assert!(entry.error.is_some());
    }

    #[test]
    fn test_failure_without_data_is_error() {
        let mut entry: CacheEntry<Vec<u8>> = CacheEntry::pending();
        entry.fail(FetchError::Status { status: 502, url: "/api/units".into() });
        assert_eq!(entry.status, FetchStatus::Error);
        assert!(entry.fresh().is_none());
    }

    #[test]
    fn test_stale_data_is_not_fresh() {
        let mut entry = CacheEntry::pending();
        entry.succeed("x", 3);
        assert_eq!(entry.fresh(), Some(&"x"));
        entry.stale = true;
        assert_eq!(entry.fresh(), None);
    }
}
