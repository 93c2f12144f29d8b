//! Leasehold
//!
//! Client-side core of a property-management dashboard:
//! - Persisted agent/landlord/property selection with cascade
//! - Scoped query keys
//! - Cached, de-duplicated fetches with stale-while-revalidate
//! - Presentation rules (palettes, thresholds, property-local time)

pub mod api;
pub mod config;
pub mod event_bus;
pub mod fetch;
pub mod presentation;
pub mod query;
pub mod selection;
pub mod session;
pub mod telemetry;
pub mod undo;

// Re-exports for convenience
pub use api::{ApiClient, Transport};
pub use config::AppConfig;
pub use event_bus::{ConsoleEvent, EventBus};
pub use fetch::{FetchCoordinator, FetchError};
pub use query::{build_key, LocalFilters, QueryKey};
pub use selection::{Role, Selection, SelectionStore};
pub use session::ConsoleSession;
