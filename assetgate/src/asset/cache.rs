//! Cache-aside layer over the asset-type store.
//!
//! Two namespaces share one invalidation policy:
//!
//! - per-identifier entries, populated by [`AssetTypeCache::get`]
//! - one aggregate entry, populated by [`AssetTypeCache::get_all`]
//!
//! # Negative caching
//!
//! A lookup that finds no record is not cached. Every waiter of that lookup
//! receives `None` and the next call queries the store again, so records
//! created by an external authoring flow become visible without an explicit
//! invalidation.
//!
//! # Deletes
//!
//! [`AssetTypeCache::delete`] deletes through the store and then invalidates
//! both the record's entry and the aggregate entry before returning. The
//! invalidation also runs when the store reports a failure, since a failed
//! transaction may still have been applied, and when the delete future is
//! dropped mid-flight.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::{AssetTypeStore, StoreError};
use super::types::AssetTypeRecord;
use crate::cache::{CacheConfig, CacheStats, LoadingCache, Superseded};

/// All cached asset-type records, in store order.
pub type AssetTypeList = Arc<[Arc<AssetTypeRecord>]>;

/// Errors returned by the asset-type cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetTypeError {
    /// The backing store failed. Not cached; the next call retries.
    #[error("Asset type store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

/// Why a population produced no value.
#[derive(Debug)]
enum LoadFailure {
    Missing,
    Store(StoreError),
}

/// Key of the aggregate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AllRecords;

/// Statistics for both cache namespaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetCacheStats {
    /// Per-identifier entries.
    pub records: CacheStats,
    /// The aggregate entry.
    pub aggregate: CacheStats,
}

impl AssetCacheStats {
    /// Both namespaces summed.
    pub fn total(&self) -> CacheStats {
        self.records.merge(&self.aggregate)
    }
}

/// Read-through cache of asset-type records.
pub struct AssetTypeCache {
    store: Arc<dyn AssetTypeStore>,
    records: LoadingCache<String, Arc<AssetTypeRecord>>,
    all: LoadingCache<AllRecords, AssetTypeList>,
}

impl AssetTypeCache {
    /// Create a cache over `store`.
    pub fn new(store: Arc<dyn AssetTypeStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            records: LoadingCache::new("asset_types", config),
            // One live key plus slots left behind by superseded loads
            all: LoadingCache::new("asset_types_all", &config.clone().with_max_entries(16)),
        }
    }

    /// Get one asset type.
    ///
    /// Concurrent misses for the same `id` share one store read.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the record exists
    /// - `Ok(None)` if it does not (not cached)
    /// - `Err(_)` if the store failed
    pub async fn get(&self, id: &str) -> Result<Option<Arc<AssetTypeRecord>>, AssetTypeError> {
        let store = Arc::clone(&self.store);
        let key = id.to_string();

        let result = self
            .records
            .try_get_with(id.to_string(), async move {
                match store.find(&key).await {
                    Ok(Some(record)) => Ok(Arc::new(record)),
                    Ok(None) => {
                        debug!(id = %key, "Asset type not found in store");
                        Err(LoadFailure::Missing)
                    }
                    Err(e) => {
                        warn!(id = %key, error = %e, "Failed to load asset type");
                        Err(LoadFailure::Store(e))
                    }
                }
            })
            .await;

        match result {
            Ok(record) => Ok(Some(record)),
            Err(failure) => match &*failure {
                LoadFailure::Missing => Ok(None),
                LoadFailure::Store(e) => Err(AssetTypeError::StoreFailure(e.clone())),
            },
        }
    }

    /// Get every asset type.
    ///
    /// Concurrent misses share one `find_all` on the store.
    pub async fn get_all(&self) -> Result<AssetTypeList, AssetTypeError> {
        let store = Arc::clone(&self.store);

        self.all
            .try_get_with(AllRecords, async move {
                match store.find_all().await {
                    Ok(records) => {
                        info!(count = records.len(), "Loaded all asset types");
                        Ok(records.into_iter().map(Arc::new).collect::<Vec<_>>().into())
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to load asset types");
                        Err(e)
                    }
                }
            })
            .await
            .map_err(|e| AssetTypeError::StoreFailure((*e).clone()))
    }

    /// Delete an asset type and evict it.
    ///
    /// Once this returns, no `get` or `get_all` started afterwards observes
    /// data from before the delete. The same holds if the returned future is
    /// dropped while the store delete is running.
    ///
    /// # Returns
    ///
    /// `true` if the record existed.
    pub async fn delete(&self, id: &str) -> Result<bool, AssetTypeError> {
        let pending = PendingEviction {
            cache: self,
            id,
            armed: true,
        };
        let result = self.store.delete(id).await;

        let (record, aggregate) = pending.supersede();
        self.records.evict(record).await;
        self.all.evict(aggregate).await;

        match result {
            Ok(existed) => {
                info!(id, existed, "Evicted cached asset types after deletion");
                Ok(existed)
            }
            Err(e) => {
                warn!(id, error = %e, "Asset type deletion failed, cache evicted anyway");
                Err(e.into())
            }
        }
    }

    /// Drop every cached entry.
    ///
    /// For writers that bypass this cache, such as the authoring flow.
    pub fn invalidate_all(&self) {
        self.records.invalidate_all();
        self.all.invalidate_all();
        info!("Evicted all cached asset types");
    }

    /// Statistics for both namespaces.
    pub fn stats(&self) -> AssetCacheStats {
        AssetCacheStats {
            records: self.records.stats(),
            aggregate: self.all.stats(),
        }
    }
}

/// Supersedes a record's entries once its delete has run, or when the delete
/// future is dropped before it finishes.
struct PendingEviction<'a> {
    cache: &'a AssetTypeCache,
    id: &'a str,
    armed: bool,
}

impl PendingEviction<'_> {
    fn supersede(mut self) -> (Superseded<String>, Superseded<AllRecords>) {
        self.armed = false;
        (
            self.cache.records.supersede(&self.id.to_string()),
            self.cache.all.supersede(&AllRecords),
        )
    }
}

impl Drop for PendingEviction<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(id = self.id, "Asset type deletion abandoned, evicting cached entries");
            // Entries stay resident until capacity eviction; only reachability matters
            let _ = self.cache.records.supersede(&self.id.to_string());
            let _ = self.cache.all.supersede(&AllRecords);
        }
    }
}
