//! Generic in-process loading cache.
//!
//! [`LoadingCache`] is a cache-aside component built on `moka::future::Cache`.
//! Callers supply the load future on every lookup; the cache decides whether
//! to run it. Two guarantees matter to the rest of the crate:
//!
//! - **Single-flight**: concurrent misses for the same key run one load and
//!   every waiter receives its result (or its error).
//! - **Read-after-invalidate**: once [`LoadingCache::invalidate`] returns, no
//!   lookup issued afterwards can observe a value loaded before it, even if
//!   that load was still in flight when the invalidation ran.
//!
//! The second guarantee is implemented with per-key generations. Entries are
//! stored under `(key, generation)`; invalidation bumps the generation so a
//! late insert from a superseded load lands in a slot nobody reads. The bump
//! is synchronous ([`LoadingCache::supersede`]) so it can run from a drop
//! guard when the invalidating future is cancelled.
//!
//! # Example
//!
//! ```ignore
//! use assetgate::cache::{CacheConfig, LoadingCache};
//!
//! let cache: LoadingCache<String, u64> = LoadingCache::new("lengths", &CacheConfig::default());
//! let len = cache
//!     .try_get_with("hello".to_string(), async { Ok::<_, std::io::Error>(5) })
//!     .await?;
//! ```

mod loading;
mod stats;

pub use loading::{CacheConfig, LoadingCache, Superseded, DEFAULT_MAX_ENTRIES};
pub use stats::CacheStats;
