//! # Query Parameter Coercion
//!
//! Turns the loose, caller-facing request shape into a [`Query`].
//!
//! Accepted keys (query string or JSON object):
//! ```text
//! q, sortBy, sortDir=asc|desc, page, pageSize, requireSearch=1,
//! filters={field: value}  or  filters[field]=value
//! ```
//!
//! Nothing here is ever rejected: numbers are read the lenient way (leading
//! digits only), floored at 1, and blank filters are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{PageSize, Query, SortDirection, DEFAULT_PAGE_SIZE};

const FILTER_PREFIX: &str = "filters[";

/// Raw query parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    from = "serde_json::Map<String, serde_json::Value>"
)]
pub struct QueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub require_search: bool,
}

impl QueryParams {
    /// Build from decoded query-string pairs (`filters[role]=admin` style).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            params.set(key.as_ref(), Some(value.into()));
        }
        params
    }

    fn set(&mut self, key: &str, value: Option<String>) {
        match key {
            "q" => self.q = value,
            "sortBy" => self.sort_by = value,
            "sortDir" => self.sort_dir = value,
            "page" => self.page = value,
            "pageSize" => self.page_size = value,
            "requireSearch" => {
                self.require_search = value.is_some_and(|v| matches!(v.trim(), "1" | "true"))
            }
            _ => {
                if let Some(field) = filter_key(key) {
                    self.add_filter(field, value);
                }
            }
        }
    }

    fn add_filter(&mut self, field: &str, value: Option<String>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.filters.insert(field.to_string(), value);
        }
    }

    /// Add a filter; blank values are ignored.
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        self.add_filter(&field, Some(value.into()));
        self
    }

    /// True when the request carries a non-blank term or any filter.
    pub fn has_search(&self) -> bool {
        self.q.as_deref().is_some_and(|q| !q.trim().is_empty()) || !self.filters.is_empty()
    }

    /// The page size as coerced, without building a whole [`Query`].
    pub fn effective_page_size(&self) -> usize {
        coerce_positive(self.page_size.as_deref(), DEFAULT_PAGE_SIZE)
    }

    /// Flatten back to query-string pairs, filters in `filters[field]` form.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let scalars = [
            ("q", &self.q),
            ("sortBy", &self.sort_by),
            ("sortDir", &self.sort_dir),
            ("page", &self.page),
            ("pageSize", &self.page_size),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.clone()));
            }
        }
        for (field, value) in &self.filters {
            pairs.push((format!("{FILTER_PREFIX}{field}]"), value.clone()));
        }
        if self.require_search {
            pairs.push(("requireSearch".to_string(), "1".to_string()));
        }
        pairs
    }

    /// Coerce into an executable [`Query`].
    pub fn to_query(&self) -> Query {
        let sort_field = self
            .sort_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Query {
            term: self.q.clone().unwrap_or_default(),
            filters: self.filters.clone(),
            sort_field,
            sort_direction: self
                .sort_dir
                .as_deref()
                .map(SortDirection::parse)
                .unwrap_or_default(),
            page: coerce_positive(self.page.as_deref(), 1),
            page_size: PageSize::Limit(self.effective_page_size()),
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for QueryParams {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut params = Self::default();
        // Nested filters first so that flattened `filters[x]` keys win.
        if let Some(serde_json::Value::Object(filters)) = map.get("filters") {
            for (field, value) in filters {
                params.add_filter(field, scalar_text(value));
            }
        }
        for (key, value) in &map {
            if key != "filters" {
                params.set(key, scalar_text(value));
            }
        }
        params
    }
}

fn filter_key(key: &str) -> Option<&str> {
    key.strip_prefix(FILTER_PREFIX)?.strip_suffix(']')
}

fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Lenient integer read: optional sign and leading digits, anything after
/// is ignored (`"12abc"` → 12, `"2.7"` → 2). `None` when no digits lead.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end]
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    Some(if negative { -magnitude } else { magnitude })
}

/// Missing input takes `default`; present but invalid or below 1 becomes 1.
fn coerce_positive(raw: Option<&str>, default: usize) -> usize {
    match raw {
        None => default,
        Some(raw) => parse_leading_int(raw)
            .filter(|n| *n >= 1)
            .map_or(1, |n| usize::try_from(n).unwrap_or(usize::MAX)),
    }
}
