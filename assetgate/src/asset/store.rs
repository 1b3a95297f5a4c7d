//! Data-access collaborator for asset-type records.
//!
//! The [`AssetTypeStore`] trait is the narrow interface the cache uses to
//! reach persistence. Each call runs inside whatever transaction boundary the
//! implementation manages; the cache never spans calls.

use std::path::Path;

use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use super::types::AssetTypeRecord;
use crate::BoxFuture;

/// Errors reported by an asset-type store.
///
/// Cloneable so a single failed load can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store is not reachable or not initialized yet.
    #[error("Asset type store unavailable: {0}")]
    Unavailable(String),

    /// A query or transaction failed.
    #[error("Asset type query failed: {0}")]
    Query(String),

    /// Seed data could not be read or parsed.
    #[error("Failed to load asset types from {path}: {reason}")]
    Seed { path: String, reason: String },
}

/// Transactional access to asset-type records keyed by identifier.
pub trait AssetTypeStore: Send + Sync {
    /// Find one record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the record exists
    /// - `Ok(None)` if it does not
    fn find(&self, id: &str) -> BoxFuture<'_, Result<Option<AssetTypeRecord>, StoreError>>;

    /// Return every record.
    fn find_all(&self) -> BoxFuture<'_, Result<Vec<AssetTypeRecord>, StoreError>>;

    /// Delete one record.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the record existed and was deleted
    /// - `Ok(false)` if there was nothing to delete
    fn delete(&self, id: &str) -> BoxFuture<'_, Result<bool, StoreError>>;
}

/// In-memory asset-type store.
///
/// Used to seed records from a JSON file for the CLI and as the store in
/// tests. `find_all` returns records ordered by identifier.
#[derive(Debug, Default)]
pub struct MemoryAssetTypeStore {
    records: DashMap<String, AssetTypeRecord>,
}

impl MemoryAssetTypeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given records.
    pub fn with_records(records: impl IntoIterator<Item = AssetTypeRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Load records from a JSON array of `{"id": ..., "descriptor": {...}}`.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let seed_error = |reason: String| StoreError::Seed {
            path: path.display().to_string(),
            reason,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
        let records: Vec<AssetTypeRecord> =
            serde_json::from_str(&contents).map_err(|e| seed_error(e.to_string()))?;

        info!(path = %path.display(), count = records.len(), "Seeded asset type store");
        Ok(Self::with_records(records))
    }

    /// Insert a record, returning the record it replaced.
    pub fn insert(&self, record: AssetTypeRecord) -> Option<AssetTypeRecord> {
        self.records.insert(record.id().to_string(), record)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AssetTypeStore for MemoryAssetTypeStore {
    fn find(&self, id: &str) -> BoxFuture<'_, Result<Option<AssetTypeRecord>, StoreError>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.records.get(&id).map(|r| r.value().clone())) })
    }

    fn find_all(&self) -> BoxFuture<'_, Result<Vec<AssetTypeRecord>, StoreError>> {
        Box::pin(async move {
            let mut records: Vec<AssetTypeRecord> =
                self.records.iter().map(|r| r.value().clone()).collect();
            records.sort_by(|a, b| a.id().cmp(b.id()));
            Ok(records)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.records.remove(&id).is_some()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetDescriptor;
    use std::io::Write;

    fn record(id: &str) -> AssetTypeRecord {
        AssetTypeRecord::new(id, AssetDescriptor::new(id.to_uppercase()))
    }

    #[tokio::test]
    async fn test_find_existing_and_missing() {
        let store = MemoryAssetTypeStore::with_records([record("pump")]);

        assert_eq!(store.find("pump").await.unwrap(), Some(record("pump")));
        assert_eq!(store.find("valve").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_all_is_ordered() {
        let store = MemoryAssetTypeStore::with_records([record("valve"), record("pump")]);

        let ids: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["pump", "valve"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryAssetTypeStore::with_records([record("pump")]);

        assert!(store.delete("pump").await.unwrap());
        assert!(!store.delete("pump").await.unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "pump", "descriptor": {{"name": "Pump", "icon": "water-pump"}}}}]"#
        )
        .unwrap();

        let store = MemoryAssetTypeStore::from_json_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_json_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = MemoryAssetTypeStore::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, StoreError::Seed { .. }));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("not wired".to_string());
        assert_eq!(err.to_string(), "Asset type store unavailable: not wired");
    }
}
