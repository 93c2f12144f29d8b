//! Fetch Module
//!
//! Request de-duplication, caching and stale-while-revalidate for every
//! dashboard screen.

mod coordinator;
mod entry;
mod error;

pub use coordinator::{FetchCoordinator, DEFAULT_CAPACITY};
pub use entry::{EntrySnapshot, FetchStatus};
pub use error::FetchError;
