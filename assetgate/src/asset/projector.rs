//! Projection of cached asset types into published descriptors.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::cache::AssetTypeCache;
use super::types::{AssetDescriptor, AssetTypeRecord};

/// Derives the externally visible asset descriptors.
///
/// Descriptor registration runs during bootstrap, possibly before the store
/// is wired up. The projector therefore never fails: with no cache attached,
/// or when the store errors, it returns an empty list and the next call tries
/// again.
#[derive(Default)]
pub struct AssetDescriptorProjector {
    cache: RwLock<Option<Arc<AssetTypeCache>>>,
}

impl AssetDescriptorProjector {
    /// Create a projector over an existing cache.
    pub fn new(cache: Arc<AssetTypeCache>) -> Self {
        Self {
            cache: RwLock::new(Some(cache)),
        }
    }

    /// Create a projector with no cache yet.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Attach (or replace) the cache once the store is available.
    pub fn attach(&self, cache: Arc<AssetTypeCache>) {
        *self.cache.write() = Some(cache);
    }

    /// Whether a cache is attached.
    pub fn is_attached(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Current asset descriptors, in store order.
    pub async fn project(&self) -> Vec<AssetDescriptor> {
        let attached = self.cache.read().clone();
        let Some(cache) = attached else {
            return Vec::new();
        };

        match cache.get_all().await {
            Ok(records) => records.iter().map(|r| descriptor_of(r)).collect(),
            Err(e) => {
                warn!(error = %e, "Asset descriptors unavailable, publishing none");
                Vec::new()
            }
        }
    }
}

fn descriptor_of(record: &AssetTypeRecord) -> AssetDescriptor {
    record.descriptor().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetTypeStore, MemoryAssetTypeStore, StoreError};
    use crate::cache::CacheConfig;
    use crate::BoxFuture;

    struct DownStore;

    impl AssetTypeStore for DownStore {
        fn find(&self, _id: &str) -> BoxFuture<'_, Result<Option<AssetTypeRecord>, StoreError>> {
            Box::pin(async { Err(StoreError::Unavailable("down".to_string())) })
        }

        fn find_all(&self) -> BoxFuture<'_, Result<Vec<AssetTypeRecord>, StoreError>> {
            Box::pin(async { Err(StoreError::Unavailable("down".to_string())) })
        }

        fn delete(&self, _id: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
            Box::pin(async { Err(StoreError::Unavailable("down".to_string())) })
        }
    }

    fn cache_over(store: impl AssetTypeStore + 'static) -> Arc<AssetTypeCache> {
        Arc::new(AssetTypeCache::new(Arc::new(store), &CacheConfig::default()))
    }

    #[tokio::test]
    async fn test_detached_projects_nothing() {
        let projector = AssetDescriptorProjector::detached();
        assert!(!projector.is_attached());
        assert!(projector.project().await.is_empty());
    }

    #[tokio::test]
    async fn test_projects_descriptors_in_store_order() {
        let store = MemoryAssetTypeStore::with_records([
            AssetTypeRecord::new("valve", AssetDescriptor::new("Valve")),
            AssetTypeRecord::new("pump", AssetDescriptor::new("Pump").with_icon("water-pump")),
        ]);
        let projector = AssetDescriptorProjector::new(cache_over(store));

        let descriptors = projector.project().await;
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Pump", "Valve"]);
        assert_eq!(descriptors[0].icon.as_deref(), Some("water-pump"));
    }

    #[tokio::test]
    async fn test_store_failure_projects_nothing() {
        let projector = AssetDescriptorProjector::new(cache_over(DownStore));
        assert!(projector.project().await.is_empty());
    }

    #[tokio::test]
    async fn test_attach_later_self_heals() {
        let projector = AssetDescriptorProjector::detached();
        assert!(projector.project().await.is_empty());

        let store = MemoryAssetTypeStore::with_records([AssetTypeRecord::new(
            "pump",
            AssetDescriptor::new("Pump"),
        )]);
        projector.attach(cache_over(store));

        assert_eq!(projector.project().await.len(), 1);
    }
}
