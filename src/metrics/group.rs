//! Group Metrics
//!
//! Counters describing what a [`Group`](crate::Group) did while serving keys.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-group counters, updated lock-free from concurrent callers.
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Every call to `Group::get`, including rejected ones
    pub gets: AtomicU64,
    /// Calls answered straight from the local cache
    pub cache_hits: AtomicU64,
    /// Calls that missed the cache and went through the deduplicator
    pub loads: AtomicU64,
    /// Loads answered by the cache after an earlier load filled it
    pub load_cache_hits: AtomicU64,
    /// Executions of the load function after deduplication
    pub loads_deduped: AtomicU64,
    /// Values fetched successfully from a remote peer
    pub peer_loads: AtomicU64,
    /// Remote fetches that failed and fell back to the origin
    pub peer_errors: AtomicU64,
    /// Values fetched successfully from the origin callback
    pub local_loads: AtomicU64,
    /// Origin callback failures
    pub local_load_errs: AtomicU64,
    /// Requests for this group received from peers
    pub server_requests: AtomicU64,
}

impl GroupStats {
    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads a counter.
    #[inline]
    pub fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Converts the counters into a sorted map.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let counters = [
            ("gets", &self.gets),
            ("cache_hits", &self.cache_hits),
            ("loads", &self.loads),
            ("load_cache_hits", &self.load_cache_hits),
            ("loads_deduped", &self.loads_deduped),
            ("peer_loads", &self.peer_loads),
            ("peer_errors", &self.peer_errors),
            ("local_loads", &self.local_loads),
            ("local_load_errs", &self.local_load_errs),
            ("server_requests", &self.server_requests),
        ];
        counters
            .into_iter()
            .map(|(name, counter)| (name.to_string(), Self::load(counter) as f64))
            .collect()
    }
}
