//! # Fixture Seeding
//!
//! Demo books and users upserted by id. Re-seeding merges into existing
//! records; only records that did not exist before count as created.

use chrono::Utc;
use folio_core::Record;
use serde::Serialize;

use crate::store::MemoryStore;

pub const BOOKS: &str = "books";
pub const USERS: &str = "users";
pub const AUDIT_LOGS: &str = "audit_logs";

/// `(id, title, author, year, pages)`
const BOOK_FIXTURES: [(&str, &str, &str, i64, i64); 10] = [
    ("bk-clean-code", "Clean Code", "Robert C. Martin", 2008, 464),
    ("bk-refactoring", "Refactoring", "Martin Fowler", 1999, 448),
    ("bk-ddd", "Domain-Driven Design", "Eric Evans", 2003, 560),
    ("bk-gof", "Design Patterns", "GoF", 1994, 395),
    ("bk-ydkjs", "You Don't Know JS", "Kyle Simpson", 2015, 278),
    ("bk-pragmatic", "The Pragmatic Programmer", "Andrew Hunt", 1999, 352),
    ("bk-ej", "Effective Java", "Joshua Bloch", 2008, 416),
    ("bk-algo", "Introduction to Algorithms", "CLRS", 2009, 1312),
    ("bk-cs", "Cracking the Coding Interview", "Gayle Laakmann", 2015, 706),
    (
        "bk-poeaa",
        "Patterns of Enterprise Application Architecture",
        "Martin Fowler",
        2002,
        533,
    ),
];

/// `(id, name, role)`; the address is `<name>@example.com` in lower case.
const USER_FIXTURES: [(&str, &str, &str); 10] = [
    ("u-alice", "Alice", "admin"),
    ("u-bob", "Bob", "editor"),
    ("u-charlie", "Charlie", "viewer"),
    ("u-daisy", "Daisy", "viewer"),
    ("u-ethan", "Ethan", "editor"),
    ("u-fiona", "Fiona", "viewer"),
    ("u-george", "George", "admin"),
    ("u-helen", "Helen", "viewer"),
    ("u-ivan", "Ivan", "editor"),
    ("u-judy", "Judy", "viewer"),
];

pub fn books() -> Vec<Record> {
    BOOK_FIXTURES
        .iter()
        .map(|&(id, title, author, year, pages)| {
            Record::new(id)
                .with("title", title)
                .with("author", author)
                .with("year", year)
                .with("pages", pages)
        })
        .collect()
}

pub fn users() -> Vec<Record> {
    USER_FIXTURES
        .iter()
        .map(|&(id, name, role)| {
            Record::new(id)
                .with("name", name)
                .with("email", format!("{}@example.com", name.to_lowercase()))
                .with("role", role)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub books: usize,
    pub users: usize,
    /// Records that did not exist before this call.
    pub created: usize,
}

/// Upsert `records` into `collection`; returns the ids that were created.
async fn upsert_all(store: &MemoryStore, collection: &str, records: Vec<Record>) -> Vec<String> {
    let mut created = Vec::new();
    for record in records {
        let id = record.id.clone();
        if store.upsert(collection, record).await {
            created.push(id);
        }
    }
    created
}

/// One `BOOK_CREATED` entry per newly created book.
async fn audit_created_books(store: &MemoryStore, ids: &[String]) {
    for id in ids {
        let entry = Record::default()
            .with("ts", Utc::now())
            .with("type", "BOOK_CREATED")
            .with("bookId", id.as_str());
        store.insert(AUDIT_LOGS, entry).await;
        tracing::info!("Audit: BOOK_CREATED {}", id);
    }
}

pub async fn seed_books(store: &MemoryStore, limit: usize) -> SeedReport {
    let fixtures: Vec<Record> = books().into_iter().take(limit).collect();
    let count = fixtures.len();
    let created = upsert_all(store, BOOKS, fixtures).await;
    audit_created_books(store, &created).await;
    SeedReport {
        books: count,
        users: 0,
        created: created.len(),
    }
}

pub async fn seed_users(store: &MemoryStore, limit: usize) -> SeedReport {
    let fixtures: Vec<Record> = users().into_iter().take(limit).collect();
    let count = fixtures.len();
    let created = upsert_all(store, USERS, fixtures).await;
    SeedReport {
        books: 0,
        users: count,
        created: created.len(),
    }
}

/// The first five books and the first five users.
pub async fn seed_all(store: &MemoryStore) -> SeedReport {
    let books = seed_books(store, 5).await;
    let users = seed_users(store, 5).await;
    SeedReport {
        books: books.books,
        users: users.users,
        created: books.created + users.created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{RecordSource, Value};

    #[test]
    fn test_fixtures() {
        let books = books();
        assert_eq!(books.len(), 10);
        assert_eq!(books[7].get("pages"), Some(&Value::Number(1312.0)));

        let users = users();
        assert_eq!(users[2].get("email"), Some(&Value::from("charlie@example.com")));
        assert_eq!(users[6].get("role"), Some(&Value::from("admin")));
    }

    #[tokio::test]
    async fn test_reseeding_is_idempotent_and_audited_once() {
        let store = MemoryStore::new();

        let first = seed_books(&store, usize::MAX).await;
        assert_eq!(first, SeedReport { books: 10, users: 0, created: 10 });

        let second = seed_books(&store, usize::MAX).await;
        assert_eq!(second.created, 0);
        assert_eq!(store.count(BOOKS).await.unwrap(), 10);

        let audit = store.fetch_all(AUDIT_LOGS).await.unwrap();
        assert_eq!(audit.len(), 10);
        assert!(audit
            .iter()
            .all(|r| r.get("type") == Some(&Value::from("BOOK_CREATED"))));
    }

    #[tokio::test]
    async fn test_seed_all_takes_five_of_each() {
        let store = MemoryStore::new();
        let report = seed_all(&store).await;
        assert_eq!(report, SeedReport { books: 5, users: 5, created: 10 });

        let users = store.fetch_all(USERS).await.unwrap();
        assert!(users.iter().any(|u| u.id == "u-ethan"));
        assert!(!users.iter().any(|u| u.id == "u-fiona"));
        assert_eq!(store.count(AUDIT_LOGS).await.unwrap(), 5);
    }
}
