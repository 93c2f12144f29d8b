//! Selection Module
//!
//! The agent/landlord/property scope the user is looking at, persisted across
//! restarts, with the cascade rule that narrowing a broader scope resets every
//! narrower one.

mod reconcile;
mod role;
mod storage;
mod store;

pub use reconcile::{property_options, reconcile};
pub use role::Role;
pub use storage::{FileStorage, MemoryStorage, SelectionStorage};
pub use store::{ScopeChange, ScopeObserver, SelectionStore};

use serde::{Deserialize, Serialize};

/// Storage key for the selected agent
pub const AGENT_KEY: &str = "selectedAgentId";
/// Storage key for the selected landlord
pub const LANDLORD_KEY: &str = "selectedLandlordId";
/// Storage key for the selected property
pub const PROPERTY_KEY: &str = "selectedPropertyId";

/// Selector value meaning "no narrowing"
pub const ALL_SENTINEL: &str = "all";

/// Snapshot of the current scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub agent_id: Option<String>,
    pub landlord_id: Option<String>,
    pub property_id: Option<String>,
}

impl Selection {
    pub fn new(agent_id: Option<&str>, landlord_id: Option<&str>, property_id: Option<&str>) -> Self {
        Self {
            agent_id: normalize_id(agent_id),
            landlord_id: normalize_id(landlord_id),
            property_id: normalize_id(property_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.agent_id.is_none() && self.landlord_id.is_none() && self.property_id.is_none()
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "agent={} landlord={} property={}",
            show(&self.agent_id),
            show(&self.landlord_id),
            show(&self.property_id)
        )
    }
}

/// Empty ids and the `"all"` sentinel carry no scope and are treated as unset
pub(crate) fn normalize_id(id: Option<&str>) -> Option<String> {
    id.and_then(option_value)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map a selector value to an id, treating the `"all"` option as unset
pub(crate) fn option_value(value: &str) -> Option<&str> {
    if value.trim().eq_ignore_ascii_case(ALL_SENTINEL) {
        None
    } else {
        Some(value)
    }
}
