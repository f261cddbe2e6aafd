//! Cache Metrics System
//!
//! Every layer of the cache reports its counters as a `BTreeMap<String, f64>`
//! through the [`CacheMetrics`] trait. BTreeMap keeps the keys sorted, so
//! snapshots print and compare the same way every time.
//!
//! - [`CoreCacheMetrics`] is kept by each [`LruCache`](crate::LruCache).
//! - [`GroupStats`] is kept by each [`Group`](crate::Group) and counts what
//!   the load protocol did: cache hits, deduplicated loads, peer and origin
//!   fetches.

use std::collections::BTreeMap;

pub mod group;

pub use group::GroupStats;

/// Counters kept by a single eviction store.
#[derive(Debug, Default, Clone)]
pub struct CoreCacheMetrics {
    /// Total number of lookups
    pub requests: u64,

    /// Lookups that found their key
    pub cache_hits: u64,

    /// Entries inserted (updates of an existing key are not counted)
    pub insertions: u64,

    /// Entries removed to satisfy the byte budget, or by `clear`
    pub evictions: u64,

    /// Total bytes written into the store
    pub bytes_written_to_cache: u64,

    /// Bytes currently held
    pub cache_size_bytes: u64,

    /// Byte budget; `0` means unbounded
    pub max_cache_size_bytes: u64,
}

impl CoreCacheMetrics {
    /// Creates an empty set of counters for a store with the given budget.
    pub fn new(max_cache_size_bytes: u64) -> Self {
        Self {
            max_cache_size_bytes,
            ..Default::default()
        }
    }

    /// Records a lookup that found its key.
    pub fn record_hit(&mut self) {
        self.requests += 1;
        self.cache_hits += 1;
    }

    /// Records a lookup that did not find its key.
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records a new entry of `size` bytes.
    pub fn record_insertion(&mut self, size: u64) {
        self.insertions += 1;
        self.cache_size_bytes += size;
        self.bytes_written_to_cache += size;
    }

    /// Records an entry of `size` bytes leaving the store under budget pressure.
    pub fn record_eviction(&mut self, size: u64) {
        self.evictions += 1;
        self.cache_size_bytes -= size;
    }

    /// Records an entry of `size` bytes being removed explicitly.
    pub fn record_removal(&mut self, size: u64) {
        self.cache_size_bytes -= size;
    }

    /// Records an existing entry's value changing size.
    pub fn record_size_change(&mut self, old_size: u64, new_size: u64) {
        self.cache_size_bytes = self.cache_size_bytes + new_size - old_size;
        self.bytes_written_to_cache += new_size;
    }

    /// Fraction of lookups that hit, or `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Fraction of lookups that missed, or `0.0` before the first lookup.
    pub fn miss_rate(&self) -> f64 {
        if self.requests > 0 {
            (self.requests - self.cache_hits) as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// How full the store is relative to its budget; `0.0` when unbounded.
    pub fn cache_utilization(&self) -> f64 {
        if self.max_cache_size_bytes > 0 {
            self.cache_size_bytes as f64 / self.max_cache_size_bytes as f64
        } else {
            0.0
        }
    }

    /// Converts the counters into a sorted map.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("requests".to_string(), self.requests as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        metrics.insert(
            "bytes_written_to_cache".to_string(),
            self.bytes_written_to_cache as f64,
        );
        metrics.insert("cache_size_bytes".to_string(), self.cache_size_bytes as f64);
        metrics.insert(
            "max_cache_size_bytes".to_string(),
            self.max_cache_size_bytes as f64,
        );
        metrics.insert("cache_utilization".to_string(), self.cache_utilization());

        metrics
    }
}

/// Uniform metrics reporting for every cache layer.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs, sorted by key.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short name identifying the reporting component (e.g. "LRU").
    fn algorithm_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_before_any_request() {
        let metrics = CoreCacheMetrics::new(0);
        assert_eq!(metrics.hit_rate(), 0.0);
        assert_eq!(metrics.miss_rate(), 0.0);
        assert_eq!(metrics.cache_utilization(), 0.0);
    }

    #[test]
    fn test_size_accounting() {
        let mut metrics = CoreCacheMetrics::new(100);
        metrics.record_insertion(40);
        metrics.record_insertion(20);
        metrics.record_size_change(20, 30);
        metrics.record_eviction(40);
        assert_eq!(metrics.cache_size_bytes, 30);
        assert_eq!(metrics.bytes_written_to_cache, 90);
        assert_eq!(metrics.cache_utilization(), 0.3);
        metrics.record_removal(30);
        assert_eq!(metrics.cache_size_bytes, 0);
    }

    #[test]
    fn test_btreemap_is_sorted() {
        let mut metrics = CoreCacheMetrics::new(10);
        metrics.record_hit();
        metrics.record_miss();
        let map = metrics.to_btreemap();
        let keys: Vec<_> = map.keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(map["hit_rate"], 0.5);
    }
}
