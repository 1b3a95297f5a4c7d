//! Custom asset-type metadata.
//!
//! - [`AssetTypeStore`]: the persistence collaborator
//! - [`AssetTypeCache`]: single-flight cache-aside layer with delete-driven
//!   invalidation
//! - [`AssetDescriptorProjector`]: derives published descriptors from the
//!   cached records

mod cache;
mod projector;
mod store;
mod types;

pub use cache::{AssetCacheStats, AssetTypeCache, AssetTypeError, AssetTypeList};
pub use projector::AssetDescriptorProjector;
pub use store::{AssetTypeStore, MemoryAssetTypeStore, StoreError};
pub use types::{AssetDescriptor, AssetTypeRecord};
