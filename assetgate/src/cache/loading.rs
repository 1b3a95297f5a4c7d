//! Single-flight loading cache backed by moka.
//!
//! Generations come from one monotonic clock. A key's generation is the
//! larger of its own entry and the cache-wide floor, so entries at or below
//! the floor can be dropped from the table without making an older slot
//! reachable again. The table holds at most one `u64` per key invalidated
//! since the floor was last raised, and raising the floor is forced once it
//! grows past `max_entries`.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache as MokaCache;
use moka::notification::RemovalCause;
use tracing::{debug, trace};

use super::stats::{CacheCounters, CacheStats};

/// Default maximum number of entries per cache.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Capacity and expiry bounds for a [`LoadingCache`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction.
    pub max_entries: u64,

    /// Optional time-to-live for entries. `None` keeps entries until they are
    /// evicted or invalidated.
    pub time_to_live: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            time_to_live: None,
        }
    }
}

impl CacheConfig {
    /// Set the maximum number of entries.
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the entry time-to-live.
    pub fn with_time_to_live(mut self, ttl: Option<Duration>) -> Self {
        self.time_to_live = ttl;
        self
    }
}

/// Storage key: the caller's key qualified by its generation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Slot<K> {
    key: K,
    generation: u64,
}

/// An entry made unreachable by [`LoadingCache::supersede`].
///
/// The value stays resident until passed to [`LoadingCache::evict`] or
/// removed by capacity or expiry.
#[must_use = "pass to `LoadingCache::evict` to free the superseded entry"]
#[derive(Debug)]
pub struct Superseded<K> {
    slot: Slot<K>,
}

/// Cache-aside map from key to a loaded value with single-flight population.
///
/// Failed loads are never stored: the error is handed to every waiter of that
/// population and the next lookup runs a fresh load.
pub struct LoadingCache<K, V> {
    /// Name used in log fields.
    name: &'static str,

    /// The underlying moka cache.
    inner: MokaCache<Slot<K>, V>,

    /// Generation of keys invalidated since the floor was last raised.
    /// Keys without an entry, or with one below `floor`, use `floor`.
    generations: DashMap<K, u64>,

    /// Lowest generation in use, raised by `invalidate_all`.
    floor: AtomicU64,

    /// Source of generation numbers. Never reused.
    clock: AtomicU64,

    /// Size of `generations` that triggers raising the floor.
    max_generations: usize,

    counters: Arc<CacheCounters>,
}

impl<K, V> LoadingCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new loading cache.
    ///
    /// # Arguments
    ///
    /// * `name` - Short name for log output (e.g. `"asset_types"`)
    /// * `config` - Capacity and expiry bounds
    pub fn new(name: &'static str, config: &CacheConfig) -> Self {
        let counters = Arc::new(CacheCounters::default());
        let listener_counters = Arc::clone(&counters);

        let mut builder = MokaCache::builder()
            .max_capacity(config.max_entries)
            .eviction_listener(move |slot: Arc<Slot<K>>, _value: V, cause: RemovalCause| {
                // Explicit removals are counted by `supersede`
                if cause.was_evicted() {
                    listener_counters.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(cache = name, key = ?slot.key, cause = ?cause, "Cache eviction");
                }
            });

        if let Some(ttl) = config.time_to_live {
            builder = builder.time_to_live(ttl);
        }

        Self {
            name,
            inner: builder.build(),
            generations: DashMap::new(),
            floor: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            max_generations: usize::try_from(config.max_entries)
                .unwrap_or(usize::MAX)
                .max(1),
            counters,
        }
    }

    /// The name this cache logs under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up `key`, running `init` on a miss.
    ///
    /// Concurrent callers missing on the same key share one execution of
    /// `init`; the futures passed by the other callers are dropped unpolled.
    /// If the caller driving the load is cancelled, a remaining waiter takes
    /// the load over.
    ///
    /// # Errors
    ///
    /// Returns the load's error, shared between all waiters of that load.
    /// Errors are not cached.
    pub async fn try_get_with<F, E>(&self, key: K, init: F) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let slot = self.slot(&key);

        if let Some(value) = self.inner.get(&slot).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!(cache = self.name, key = ?key, "Cache hit");
            return Ok(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, key = ?key, "Cache miss");

        let counters = Arc::clone(&self.counters);
        self.inner
            .try_get_with(slot, async move {
                counters.loads.fetch_add(1, Ordering::Relaxed);
                let result = init.await;
                if result.is_err() {
                    counters.load_failures.fetch_add(1, Ordering::Relaxed);
                }
                result
            })
            .await
    }

    /// Return the cached value for `key` without loading.
    pub async fn get_if_present(&self, key: &K) -> Option<V> {
        self.inner.get(&self.slot(key)).await
    }

    /// Make the current entry for `key` unreachable, without awaiting.
    ///
    /// Takes effect before this returns: later lookups for `key` miss, and a
    /// load for `key` still in flight completes for its own waiters only.
    /// Safe to call from `Drop`.
    pub fn supersede(&self, key: &K) -> Superseded<K> {
        let previous = self.slot(key);
        let generation = self.clock.fetch_add(1, Ordering::AcqRel) + 1;
        self.generations
            .entry(key.clone())
            .and_modify(|g| *g = (*g).max(generation))
            .or_insert(generation);

        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, key = ?key, "Cache invalidated key");

        if self.generations.len() > self.max_generations {
            debug!(
                cache = self.name,
                tracked = self.generations.len(),
                "Generation table full, invalidating all keys"
            );
            self.raise_floor();
        }

        Superseded { slot: previous }
    }

    /// Free the entry left behind by [`LoadingCache::supersede`].
    pub async fn evict(&self, superseded: Superseded<K>) {
        self.inner.invalidate(&superseded.slot).await;
    }

    /// Invalidate a single key.
    ///
    /// After this returns, lookups for `key` miss and load afresh. A load for
    /// `key` that is still in flight completes for its own waiters, but its
    /// value is never returned to later lookups.
    pub async fn invalidate(&self, key: &K) {
        let superseded = self.supersede(key);
        self.evict(superseded).await;
    }

    /// Invalidate every key, including loads still in flight.
    pub fn invalidate_all(&self) {
        self.raise_floor();

        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, "Cache invalidated all keys");
    }

    /// Run moka's pending maintenance so counts and evictions are current.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entry_count())
    }

    /// Move every key to a fresh generation and forget per-key generations
    /// the new floor covers.
    fn raise_floor(&self) {
        let floor = self.clock.fetch_add(1, Ordering::AcqRel) + 1;
        self.floor.fetch_max(floor, Ordering::AcqRel);
        self.generations.retain(|_, g| *g > floor);
        self.inner.invalidate_all();
    }

    fn slot(&self, key: &K) -> Slot<K> {
        // Per-key generation first: a pruned entry implies the raised floor
        // is already visible.
        let own = self.generations.get(key).map(|g| *g);
        let floor = self.floor.load(Ordering::Acquire);
        Slot {
            key: key.clone(),
            generation: own.map_or(floor, |g| g.max(floor)),
        }
    }
}
