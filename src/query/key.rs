//! Query keys: the identity a fetch is cached and de-duplicated under.

use chrono::NaiveDate;
use std::fmt;

use super::LocalFilters;
use crate::selection::{Role, Selection, ALL_SENTINEL};

/// One element of a key after the resource path, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Agent(String),
    Landlord(String),
    Property(String),
    Search(String),
    Status(String),
    DateFrom(NaiveDate),
    DateTo(NaiveDate),
    Extra(String, String),
}

impl KeyPart {
    /// Request parameter name and value
    pub fn wire(&self) -> (&str, String) {
        match self {
            KeyPart::Agent(v) => ("agentId", v.clone()),
            KeyPart::Landlord(v) => ("landlordId", v.clone()),
            KeyPart::Property(v) => ("propertyId", v.clone()),
            KeyPart::Search(v) => ("search", v.clone()),
            KeyPart::Status(v) => ("status", v.clone()),
            KeyPart::DateFrom(d) => ("dateFrom", d.format("%Y-%m-%d").to_string()),
            KeyPart::DateTo(d) => ("dateTo", d.format("%Y-%m-%d").to_string()),
            KeyPart::Extra(name, v) => (name.as_str(), v.clone()),
        }
    }

    pub fn is_scope(&self) -> bool {
        matches!(self, KeyPart::Agent(_) | KeyPart::Landlord(_) | KeyPart::Property(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: String,
    parts: Vec<KeyPart>,
}

impl QueryKey {
    /// An unscoped key for a whole resource
    pub fn resource(path: &str) -> Self {
        Self {
            resource: normalize_path(path),
            parts: Vec::new(),
        }
    }

    pub fn resource_path(&self) -> &str {
        &self.resource
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Whether this key carries any agent/landlord/property scope
    pub fn is_scoped(&self) -> bool {
        self.parts.iter().any(KeyPart::is_scope)
    }

    pub fn query_pairs(&self) -> Vec<(&str, String)> {
        self.parts.iter().map(KeyPart::wire).collect()
    }

    /// `resource?name=value&...`, URL-encoded
    pub fn request_path(&self) -> String {
        if self.parts.is_empty() {
            return self.resource.clone();
        }
        let query = self
            .query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.resource, query)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.resource)?;
        for (name, value) in self.query_pairs() {
            write!(f, ", {}={}", name, value)?;
        }
        write!(f, "]")
    }
}

/// Build the key for `resource` under the current scope and local filters.
///
/// Element order is fixed: agent, landlord, property, search, status,
/// date-from, date-to, then extra filters by name. Agent and landlord scope
/// are only carried for administrative roles, so client-scoped screens never
/// share cache entries across tenants.
pub fn build_key(resource: &str, selection: &Selection, role: Role, filters: &LocalFilters) -> QueryKey {
    let mut parts = Vec::new();

    if role.is_administrative() {
        if let Some(agent) = scope_id(&selection.agent_id) {
            parts.push(KeyPart::Agent(agent.to_string()));
        }
        if let Some(landlord) = scope_id(&selection.landlord_id) {
            parts.push(KeyPart::Landlord(landlord.to_string()));
        }
    }
    if let Some(property) = scope_id(&selection.property_id) {
        parts.push(KeyPart::Property(property.to_string()));
    }

    if let Some(search) = filters.search_value() {
        parts.push(KeyPart::Search(search.to_string()));
    }
    if let Some(status) = filters.status_value() {
        parts.push(KeyPart::Status(status.to_string()));
    }
    if let Some(from) = filters.date_from {
        parts.push(KeyPart::DateFrom(from));
    }
    if let Some(to) = filters.date_to {
        parts.push(KeyPart::DateTo(to));
    }
    for (name, value) in filters.extra_values() {
        parts.push(KeyPart::Extra(name.to_string(), value.to_string()));
    }

    QueryKey {
        resource: normalize_path(resource),
        parts,
    }
}

/// A selection field that narrows the scope: set, non-blank, not `"all"`
fn scope_id(id: &Option<String>) -> Option<&str> {
    id.as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty() && !id.eq_ignore_ascii_case(ALL_SENTINEL))
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
