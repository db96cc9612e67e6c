//! # Recipient Resolution
//!
//! Explicit address lists are split and trimmed; search-derived lists are
//! projected out of a query result. Either way the final list is
//! deduplicated in first-seen order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::query::{apply, Query};
use crate::record::{Record, Value};

/// The `to` field of a request: one comma-separated string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    List(Vec<String>),
    Csv(String),
}

impl Recipients {
    /// False for `""` and `[]`, which callers treat as "no list given".
    pub fn is_present(&self) -> bool {
        match self {
            Recipients::List(list) => !list.is_empty(),
            Recipients::Csv(csv) => !csv.is_empty(),
        }
    }

    /// Trimmed, non-empty addresses. Only the string form is split on commas.
    pub fn addresses(&self) -> Vec<String> {
        match self {
            Recipients::List(list) => list
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Recipients::Csv(csv) => split_addresses(csv),
        }
    }
}

impl From<&str> for Recipients {
    fn from(csv: &str) -> Self {
        Recipients::Csv(csv.to_string())
    }
}

impl From<Vec<String>> for Recipients {
    fn from(list: Vec<String>) -> Self {
        Recipients::List(list)
    }
}

/// Split a comma-separated address string, trimming and dropping blanks.
pub fn split_addresses(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Exact-match (case-sensitive) dedupe after trimming, keeping first
/// occurrences in order. Blank entries are dropped.
pub fn dedupe<I, S>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter_map(|addr| {
            let addr = addr.as_ref().trim();
            (!addr.is_empty() && seen.insert(addr.to_string())).then(|| addr.to_string())
        })
        .collect()
}

/// Run `query` over `records` with pagination disabled and collect the
/// `email_field` of every match. Records whose field is missing, null, or
/// not a non-blank string are skipped.
pub fn derive_addresses(records: &[Record], query: &Query, email_field: &str) -> Vec<String> {
    let result = apply(records, &query.clone().unbounded());
    result
        .items
        .iter()
        .filter_map(|record| match record.get(email_field) {
            Some(Value::String(addr)) if !addr.trim().is_empty() => Some(addr.trim().to_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trims_and_drops_blanks() {
        assert_eq!(
            split_addresses(" a@x.io, ,b@x.io,,  c@x.io "),
            ["a@x.io", "b@x.io", "c@x.io"]
        );
        assert!(split_addresses("").is_empty());
    }

    #[test]
    fn test_list_entries_are_not_split() {
        let to = Recipients::List(vec![" a@x.io ".into(), "".into(), "b@x.io,c@x.io".into()]);
        assert_eq!(to.addresses(), ["a@x.io", "b@x.io,c@x.io"]);
    }

    #[test]
    fn test_presence() {
        assert!(!Recipients::Csv(String::new()).is_present());
        assert!(!Recipients::List(Vec::new()).is_present());
        assert!(Recipients::Csv(" ".into()).is_present());
    }

    #[test]
    fn test_untagged_deserialization() {
        let one: Recipients = serde_json::from_str(r#""a@x.io,b@x.io""#).unwrap();
        assert_eq!(one, Recipients::Csv("a@x.io,b@x.io".into()));
        let many: Recipients = serde_json::from_str(r#"["a@x.io"]"#).unwrap();
        assert_eq!(many, Recipients::List(vec!["a@x.io".into()]));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let list = ["b@x.io", "a@x.io", " b@x.io", "A@x.io", "a@x.io", ""];
        let once = dedupe(list);
        assert_eq!(once, ["b@x.io", "a@x.io", "A@x.io"]);
        assert_eq!(dedupe(&once), once);
    }

    #[test]
    fn test_derivation_ignores_pagination_and_bad_values() {
        let mut records: Vec<Record> = (0..25)
            .map(|i| {
                Record::new(format!("u-{i}"))
                    .with("role", if i % 2 == 0 { "viewer" } else { "editor" })
                    .with("email", format!("user{i}@example.com"))
            })
            .collect();
        records.push(Record::new("u-null").with("role", "viewer").with("email", Value::Null));
        records.push(Record::new("u-blank").with("role", "viewer").with("email", "  "));
        records.push(Record::new("u-none").with("role", "viewer"));

        let query = Query::default().filter("role", "viewer").page(1, 2);
        let addresses = derive_addresses(&records, &query, "email");
        assert_eq!(addresses.len(), 13);
        assert_eq!(addresses[0], "user0@example.com");
        assert_eq!(addresses[12], "user24@example.com");
    }
}
