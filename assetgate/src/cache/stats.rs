//! Cache statistics.
//!
//! Counters are lock-free atomics updated on the lookup path; [`CacheStats`]
//! is a point-in-time copy for display and assertions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between a cache and its eviction listener.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) loads: AtomicU64,
    pub(crate) load_failures: AtomicU64,
    pub(crate) invalidations: AtomicU64,
    pub(crate) evictions: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn snapshot(&self, entry_count: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count,
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from memory.
    pub hits: u64,
    /// Lookups that had to wait on a load (their own or a shared one).
    pub misses: u64,
    /// Loads actually executed against the backing source.
    pub loads: u64,
    /// Loads that returned an error.
    pub load_failures: u64,
    /// Explicit invalidations.
    pub invalidations: u64,
    /// Entries removed by capacity or expiry.
    pub evictions: u64,
    /// Approximate number of live entries.
    pub entry_count: u64,
}

impl CacheStats {
    /// Fraction of lookups served from memory, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Combine two snapshots (used to report both asset namespaces at once).
    pub fn merge(&self, other: &CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            loads: self.loads + other.loads,
            load_failures: self.load_failures + other.load_failures,
            invalidations: self.invalidations + other.invalidations,
            evictions: self.evictions + other.evictions,
            entry_count: self.entry_count + other.entry_count,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits, {} misses, {} loads ({} failed), {} invalidations, {} evictions, {} entries",
            self.hits,
            self.misses,
            self.loads,
            self.load_failures,
            self.invalidations,
            self.evictions,
            self.entry_count
        )
    }
}
