use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::selection::ALL_SENTINEL;

/// Parameter names owned by the scope and the named filters. An extra
/// filter can never take one of them.
pub const RESERVED_NAMES: [&str; 7] = ["agentId", "landlordId", "propertyId", "search", "status", "dateFrom", "dateTo"];

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name.trim()))
}

/// A screen's own filter inputs.
///
/// Unset, blank and "all" values are dropped when a key is built, so an
/// untouched filter and a cleared one produce the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFilters {
    pub search: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Screen-specific filters, ordered by name
    pub extra: BTreeMap<String, String>,
}

impl LocalFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    /// Add a screen-specific filter. Reserved names are ignored when the key
    /// is built.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Parse `name=value` pairs as typed at the console.
    ///
    /// `search`, `status`, `from`/`dateFrom` and `to`/`dateTo` map to the
    /// named filters; anything else becomes an extra filter.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut filters = Self::new();
        for pair in pairs {
            let (name, value) = pair
                .split_once('=')
                .with_context(|| format!("Expected name=value, got '{}'", pair))?;
            filters = match name {
                "search" | "q" => filters.search(value),
                "status" | "category" => filters.status(value),
                "from" | "dateFrom" => filters.date_from(parse_date(value)?),
                "to" | "dateTo" => filters.date_to(parse_date(value)?),
                other if is_reserved(other) => bail!("'{}' is set by the current selection, not a filter", other),
                other => filters.with(other, value),
            };
        }
        Ok(filters)
    }

    pub(crate) fn search_value(&self) -> Option<&str> {
        present(self.search.as_deref())
    }

    pub(crate) fn status_value(&self) -> Option<&str> {
        present(self.status.as_deref()).filter(|s| !s.eq_ignore_ascii_case(ALL_SENTINEL))
    }

    pub(crate) fn extra_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.extra
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .filter_map(|(k, v)| present(Some(v.as_str())).map(|v| (k.as_str(), v)))
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}
