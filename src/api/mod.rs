//! API Module
//!
//! The request/response contract with the dashboard's REST backend and the
//! canonical shapes its payloads are normalized into.

mod client;
mod records;

pub use client::{ApiClient, Mutation, Transport};
pub use records::{decode, decode_list, InvoiceSettings, Landlord, Property, DEFAULT_TIMEZONE_OFFSET};
