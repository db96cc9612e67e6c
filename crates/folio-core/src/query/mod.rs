//! # Record Query Engine
//!
//! Declarative list/search/filter/sort/paginate over a full collection
//! snapshot. Callers build a [`Query`] (usually by coercing loose request
//! parameters through [`QueryParams`]) and run it with [`executor::apply`].

pub mod executor;
pub mod parser;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::Record;

pub use executor::apply;
pub use parser::{parse_leading_int, QueryParams};

/// Page size used when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sort direction. A blank value reads as ascending; any other value that
/// is not `asc` reads as descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// How many records one page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    /// At most this many items (values below 1 act as 1).
    Limit(usize),
    /// A single page holding every matching record.
    Unbounded,
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Limit(DEFAULT_PAGE_SIZE)
    }
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Free-text term matched against every field (empty = no filter).
    pub term: String,
    /// Per-field substring filters, ANDed together. Blank values are ignored.
    pub filters: BTreeMap<String, String>,
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    /// 1-based page number.
    pub page: usize,
    pub page_size: PageSize,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            term: String::new(),
            filters: BTreeMap::new(),
            sort_field: None,
            sort_direction: SortDirection::Asc,
            page: 1,
            page_size: PageSize::default(),
        }
    }
}

impl Query {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_field = Some(field.into());
        self.sort_direction = direction;
        self
    }

    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page.max(1);
        self.page_size = PageSize::Limit(page_size.max(1));
        self
    }

    /// The same query with pagination disabled, starting from page 1.
    pub fn unbounded(mut self) -> Self {
        self.page = 1;
        self.page_size = PageSize::Unbounded;
        self
    }
}

/// Query execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// The requested page of the filtered, sorted sequence.
    pub items: Vec<Record>,
    /// Matching records before pagination.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl QueryResult {
    pub fn empty(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Number of pages needed to cover `total`.
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size.max(1))
    }
}
