//! # Query Executor
//!
//! Evaluates a [`Query`] against an in-memory record snapshot:
//! free-text → field filters → sort → count → paginate.

use std::cmp::Ordering;

use super::{PageSize, Query, QueryResult, SortDirection};
use crate::record::{compare_values, Record};

/// Run `query` over `records`. Pure: the input slice is never reordered.
pub fn apply(records: &[Record], query: &Query) -> QueryResult {
    let term = query.term.to_lowercase();
    let filters: Vec<(&str, String)> = query
        .filters
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(field, value)| (field.as_str(), value.to_lowercase()))
        .collect();

    let mut matched: Vec<&Record> = records
        .iter()
        .filter(|record| term.is_empty() || matches_term(record, &term))
        .filter(|record| {
            filters
                .iter()
                .all(|(field, needle)| contains_lowercase(&record.value(field).as_text(), needle))
        })
        .collect();

    let total = matched.len();

    if let Some(field) = query.sort_field.as_deref().filter(|f| !f.is_empty()) {
        matched.sort_by(|a, b| {
            directed(
                compare_values(&a.value(field), &b.value(field)),
                query.sort_direction,
            )
        });
    }

    let page = query.page.max(1);
    let page_size = match query.page_size {
        PageSize::Limit(n) => n.max(1),
        PageSize::Unbounded => total.max(1),
    };
    let start = (page - 1).saturating_mul(page_size);

    let items: Vec<Record> = matched
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    QueryResult {
        items,
        total,
        page,
        page_size,
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn matches_term(record: &Record, term: &str) -> bool {
    record
        .searchable_values()
        .any(|value| contains_lowercase(&value.as_text(), term))
}

/// `needle` must already be lower-cased.
fn contains_lowercase(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryParams;
    use crate::record::Value;

    fn books() -> Vec<Record> {
        vec![
            Record::new("bk-clean-code")
                .with("title", "Clean Code")
                .with("author", "Robert C. Martin")
                .with("year", 2008),
            Record::new("bk-refactoring")
                .with("title", "Refactoring")
                .with("author", "Martin Fowler")
                .with("year", 1999),
            Record::new("bk-ddd")
                .with("title", "Domain-Driven Design")
                .with("author", "Eric Evans")
                .with("year", 2003),
            Record::new("bk-gof")
                .with("title", "Design Patterns")
                .with("author", "GoF")
                .with("year", 1994),
            Record::new("bk-ydkjs")
                .with("title", "You Don't Know JS")
                .with("author", "Kyle Simpson")
                .with("year", 2015),
            Record::new("bk-draft").with("title", "untitled draft"),
        ]
    }

    fn ids(result: &QueryResult) -> Vec<&str> {
        result.items.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_free_text_scenario() {
        let records = vec![
            Record::new("a").with("name", "Clean Code").with("year", 2008),
            Record::new("b").with("name", "Refactoring").with("year", 1999),
        ];
        let result = apply(&records, &Query::search("code"));
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].get("name"), Some(&Value::from("Clean Code")));
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let records = books();
        let result = apply(&records, &Query::default().page(1, 100));
        assert_eq!(result.total, records.len());
        // Without a sort field the input order is kept.
        assert_eq!(result.items, records);
    }

    #[test]
    fn test_empty_records() {
        let result = apply(&[], &Query::search("anything"));
        assert_eq!(result.total, 0);
        assert!(result.items.is_empty());
        assert_eq!(result.page, 1);
    }

    #[test]
    fn test_free_text_covers_numbers_and_id() {
        let records = books();
        assert_eq!(ids(&apply(&records, &Query::search("199"))), ["bk-refactoring", "bk-gof"]);
        assert_eq!(ids(&apply(&records, &Query::search("BK-DDD"))), ["bk-ddd"]);
    }

    #[test]
    fn test_filters_and_together() {
        let records = books();
        let query = Query::default().filter("author", "martin").filter("year", "200");
        let result = apply(&records, &query);
        assert_eq!(ids(&result), ["bk-clean-code"]);

        let query = Query::search("design").filter("author", "evans");
        assert_eq!(ids(&apply(&records, &query)), ["bk-ddd"]);
    }

    #[test]
    fn test_blank_filter_is_ignored() {
        let records = books();
        let query = Query::default().filter("author", "  ").page(1, 100);
        assert_eq!(apply(&records, &query).total, records.len());
    }

    #[test]
    fn test_missing_field_never_matches_a_filter() {
        let records = books();
        let result = apply(&records, &Query::default().filter("author", "a").page(1, 100));
        assert!(!ids(&result).contains(&"bk-draft"));
    }

    #[test]
    fn test_items_satisfy_every_predicate() {
        let records = books();
        let query = Query::search("e").filter("title", "d");
        let result = apply(&records, &query.clone().unbounded());
        assert!(result.total <= records.len());
        for item in &result.items {
            assert!(item.searchable_values().any(|v| v.as_text().to_lowercase().contains('e')));
            assert!(item.value("title").as_text().to_lowercase().contains('d'));
        }
    }

    #[test]
    fn test_numeric_sort_with_nulls_least() {
        let records = books();
        let asc = apply(&records, &Query::default().sort_by("year", SortDirection::Asc).page(1, 10));
        assert_eq!(
            ids(&asc),
            ["bk-draft", "bk-gof", "bk-refactoring", "bk-ddd", "bk-clean-code", "bk-ydkjs"]
        );

        let desc = apply(&records, &Query::default().sort_by("year", SortDirection::Desc).page(1, 10));
        assert_eq!(
            ids(&desc),
            ["bk-ydkjs", "bk-clean-code", "bk-ddd", "bk-refactoring", "bk-gof", "bk-draft"]
        );
    }

    #[test]
    fn test_mixed_number_and_string_column_sorts() {
        // Schema-free rows: the same field is sometimes a number, sometimes text.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            seed >> 33
        };
        for size in [3usize, 20, 64, 300] {
            let records: Vec<Record> = (0..size)
                .map(|i| {
                    let n = (next() % 2_000) as i64;
                    let year = match next() % 3 {
                        0 => Value::from(n.to_string()),
                        1 => Value::Null,
                        _ => Value::from(n),
                    };
                    Record::new(format!("r{i}")).with("year", year)
                })
                .collect();

            for direction in [SortDirection::Asc, SortDirection::Desc] {
                let result = apply(&records, &Query::default().sort_by("year", direction).unbounded());
                assert_eq!(result.items.len(), size);
                for pair in result.items.windows(2) {
                    let ordering = compare_values(&pair[0].value("year"), &pair[1].value("year"));
                    assert_ne!(ordering, directed(Ordering::Greater, direction));
                }
            }
        }

        let records = vec![
            Record::new("a").with("year", "5"),
            Record::new("b").with("year", 10),
            Record::new("c").with("year", 9),
        ];
        let asc = apply(&records, &Query::default().sort_by("year", SortDirection::Asc));
        assert_eq!(ids(&asc), ["c", "b", "a"]);
    }

    #[test]
    fn test_string_sort_is_case_insensitive() {
        let records = vec![
            Record::new("1").with("name", "bob"),
            Record::new("2").with("name", "Alice"),
            Record::new("3").with("name", "charlie"),
        ];
        let result = apply(&records, &Query::default().sort_by("name", SortDirection::Asc));
        assert_eq!(ids(&result), ["2", "1", "3"]);
    }

    #[test]
    fn test_reversing_direction_reverses_distinct_keys() {
        let records = books();
        let asc = apply(&records, &Query::default().sort_by("title", SortDirection::Asc).unbounded());
        let desc = apply(&records, &Query::default().sort_by("title", SortDirection::Desc).unbounded());
        let mut reversed = ids(&desc);
        reversed.reverse();
        assert_eq!(ids(&asc), reversed);
    }

    #[test]
    fn test_unknown_sort_field_keeps_everything() {
        let records = books();
        let result = apply(&records, &Query::default().sort_by("isbn", SortDirection::Desc).unbounded());
        assert_eq!(result.total, records.len());
        assert_eq!(result.items.len(), records.len());
    }

    #[test]
    fn test_pages_are_exhaustive_and_disjoint() {
        let records = books();
        let base = Query::default().sort_by("title", SortDirection::Asc);
        let full = apply(&records, &base.clone().unbounded());

        let mut collected = Vec::new();
        let first = apply(&records, &base.clone().page(1, 4));
        for page in 1..=first.page_count() {
            collected.extend(apply(&records, &base.clone().page(page, 4)).items);
        }
        assert_eq!(first.page_count(), 2);
        assert_eq!(collected, full.items);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let records = books();
        let result = apply(&records, &Query::default().page(9, 5));
        assert!(result.items.is_empty());
        assert_eq!(result.total, records.len());
        assert_eq!(result.page, 9);
    }

    #[test]
    fn test_clamped_params_paginate_one_item() {
        let records = books();
        let query = QueryParams::from_pairs([("page", "0"), ("pageSize", "-5")]).to_query();
        let result = apply(&records, &query);
        assert_eq!(result.page, 1);
        assert_eq!(result.page_size, 1);
        assert_eq!(ids(&result), ["bk-clean-code"]);
    }

    #[test]
    fn test_unbounded_returns_single_page() {
        let records = books();
        let result = apply(&records, &Query::search("o").unbounded());
        assert_eq!(result.items.len(), result.total);
        assert_eq!(result.page_size, result.total);
    }

    #[test]
    fn test_input_is_untouched() {
        let records = books();
        let before = records.clone();
        let _ = apply(&records, &Query::default().sort_by("year", SortDirection::Desc));
        assert_eq!(records, before);
    }
}
