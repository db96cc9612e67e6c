//! # Record Store
//!
//! In-memory collections of [`Record`]s keyed by id. Implements
//! [`RecordSource`] for the query engine and the bulk dispatcher, and offers
//! the few writes the hub needs: merge-upsert, append and retention deletes.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use folio_core::{Record, RecordSource, SourceError};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

type Collection = BTreeMap<String, Record>;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store where each of `names` exists, empty.
    pub fn with_collections<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collections = names
            .into_iter()
            .map(|name| (name.into(), Collection::new()))
            .collect();
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Collection names with their record counts, sorted by name.
    pub async fn summary(&self) -> Vec<(String, usize)> {
        let collections = self.collections.read().await;
        let mut summary: Vec<(String, usize)> = collections
            .iter()
            .map(|(name, records)| (name.clone(), records.len()))
            .collect();
        summary.sort();
        summary
    }

    pub async fn count(&self, collection: &str) -> Result<usize, SourceError> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(BTreeMap::len)
            .ok_or_else(|| SourceError::NotFound(collection.to_string()))
    }

    pub async fn get(&self, collection: &str, id: &str) -> Option<Record> {
        let collections = self.collections.read().await;
        collections.get(collection)?.get(id).cloned()
    }

    /// Merge `record` into the stored record with the same id, creating the
    /// collection and the record as needed. Returns true if the record is new.
    pub async fn upsert(&self, collection: &str, record: Record) -> bool {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        match records.get_mut(&record.id) {
            Some(existing) => {
                existing.fields.extend(record.fields);
                false
            }
            None => {
                records.insert(record.id.clone(), record);
                true
            }
        }
    }

    /// Append `record`, generating an id when it has none. Returns the id.
    pub async fn insert(&self, collection: &str, mut record: Record) -> String {
        if record.id.is_empty() {
            record.id = uuid::Uuid::new_v4().as_simple().to_string();
        }
        let id = record.id.clone();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        id
    }

    /// Keep only the records of `collection` for which `keep` holds.
    /// Returns how many were removed.
    pub async fn retain<F>(&self, collection: &str, mut keep: F) -> usize
    where
        F: FnMut(&Record) -> bool,
    {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(collection) else {
            return 0;
        };
        let before = records.len();
        records.retain(|_, record| keep(record));
        before - records.len()
    }

    /// Load `<dir>/<name>.json` (a JSON array of records) for each name that
    /// has a file. Records without an id get a generated one. Returns the
    /// number of records loaded.
    pub async fn load_dir(&self, dir: &Path, names: &[String]) -> Result<usize, LoadError> {
        let mut loaded = 0;
        for name in names {
            let path = dir.join(format!("{name}.json"));
            if !path.exists() {
                tracing::warn!("No seed file for '{}' at {:?}", name, path);
                continue;
            }
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| LoadError::Read {
                    path: path.clone(),
                    source,
                })?;
            let records: Vec<Record> =
                serde_json::from_str(&content).map_err(|source| LoadError::Parse {
                    path: path.clone(),
                    source,
                })?;

            let count = records.len();
            for record in records {
                self.insert(name, record).await;
            }
            tracing::info!("Loaded {} records into '{}' from {:?}", count, name, path);
            loaded += count;
        }
        Ok(loaded)
    }
}

#[async_trait::async_trait]
impl RecordSource for MemoryStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>, SourceError> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .ok_or_else(|| SourceError::NotFound(collection.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Value;

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let store = MemoryStore::with_collections(["books"]);
        assert_eq!(store.fetch_all("books").await.unwrap(), Vec::new());
        assert_eq!(
            store.fetch_all("magazines").await,
            Err(SourceError::NotFound("magazines".into()))
        );
        assert!(store.count("magazines").await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_merges_fields() {
        let store = MemoryStore::new();
        let created = store
            .upsert("users", Record::new("u-alice").with("name", "Alice").with("team", "core"))
            .await;
        assert!(created);

        let created = store
            .upsert("users", Record::new("u-alice").with("name", "Alice L."))
            .await;
        assert!(!created);

        let alice = store.get("users", "u-alice").await.unwrap();
        assert_eq!(alice.get("name"), Some(&Value::from("Alice L.")));
        assert_eq!(alice.get("team"), Some(&Value::from("core")));
        assert_eq!(store.count("users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_is_ordered_by_id() {
        let store = MemoryStore::new();
        for id in ["u-charlie", "u-alice", "u-bob"] {
            store.insert("users", Record::new(id)).await;
        }
        let ids: Vec<String> = store
            .fetch_all("users")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["u-alice", "u-bob", "u-charlie"]);
    }

    #[tokio::test]
    async fn test_insert_generates_ids_and_retain_removes() {
        let store = MemoryStore::new();
        let a = store.insert("logs", Record::default().with("keep", true)).await;
        let b = store.insert("logs", Record::default().with("keep", false)).await;
        assert!(!a.is_empty());
        assert_ne!(a, b);

        let removed = store
            .retain("logs", |r| r.get("keep") == Some(&Value::Bool(true)))
            .await;
        assert_eq!(removed, 1);
        assert_eq!(store.count("logs").await.unwrap(), 1);
        assert_eq!(store.retain("missing", |_| false).await, 0);
    }

    #[tokio::test]
    async fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("books.json"),
            r#"[{"id": "bk-ddd", "title": "Domain-Driven Design", "year": 2003},
                {"title": "No Id"}]"#,
        )
        .unwrap();

        let store = MemoryStore::with_collections(["books", "users"]);
        let names = vec!["books".to_string(), "users".to_string()];
        let loaded = store.load_dir(dir.path(), &names).await.unwrap();
        assert_eq!(loaded, 2);

        let ddd = store.get("books", "bk-ddd").await.unwrap();
        assert_eq!(ddd.get("year"), Some(&Value::Number(2003.0)));
        assert_eq!(store.count("users").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_dir_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("users.json"), "{not json").unwrap();
        let store = MemoryStore::new();
        let err = store
            .load_dir(dir.path(), &["users".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }
}
