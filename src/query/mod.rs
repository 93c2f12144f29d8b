//! Query Module
//!
//! Derives the cache identity and request parameters of a fetch from the
//! current scope plus a screen's local filters.

mod filters;
mod key;

pub use filters::LocalFilters;
pub use key::{build_key, KeyPart, QueryKey};
