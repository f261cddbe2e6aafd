//! Byte-budgeted Least Recently Used (LRU) store
//!
//! This module provides the eviction store that sits underneath every cache
//! namespace. Entries are kept in order of recency of use and the store evicts
//! from the least recently used end whenever the total size of its entries
//! exceeds a byte budget.
//!
//! # Size Accounting
//!
//! Each entry contributes `key.len() + value.weight()` bytes to the total. A
//! budget of `0` means the store is unbounded and never evicts on its own.
//!
//! # Performance Characteristics
//!
//! - Get: O(1)
//! - Add: O(1) amortized, plus one O(1) removal per evicted entry
//! - Remove: O(1)
//!
//! # Thread Safety
//!
//! `LruCache` is not thread-safe; even `get` mutates the usage order. Use
//! [`ConcurrentCache`](crate::ConcurrentCache) to share a store between threads.

use crate::config::LruCacheConfig;
use crate::list::{Node, UsageList};
use crate::metrics::{CacheMetrics, CoreCacheMetrics};
use std::collections::BTreeMap;
use std::fmt;
use std::ptr::NonNull;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Values stored in an [`LruCache`] report how many bytes they account for.
pub trait Weighted {
    /// Size of the value in bytes, for budget accounting.
    fn weight(&self) -> usize;
}

impl Weighted for Vec<u8> {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl Weighted for String {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl Weighted for &str {
    fn weight(&self) -> usize {
        self.len()
    }
}

/// Hook invoked with the key and value of every entry the store evicts.
///
/// It runs synchronously while the store is being mutated and must not call
/// back into the store.
pub type EvictionCallback<V> = Box<dyn FnMut(&str, &V) + Send>;

type Slot<V> = NonNull<Node<(String, V)>>;

/// A byte-budgeted LRU store keyed by strings.
///
/// # Examples
///
/// ```
/// use peercache::LruCache;
///
/// // Budget of 10 bytes: each entry costs key length plus value length.
/// let mut cache: LruCache<String> = LruCache::new(10);
/// cache.add("k1", "1234".to_string()); // 6 bytes
/// cache.add("k2", "12".to_string());   // 4 bytes, total 10
/// cache.get("k1");                     // k1 becomes most recently used
/// cache.add("k3", "1".to_string());    // 3 bytes: k2 is evicted
///
/// assert!(cache.get("k2").is_none());
/// assert_eq!(cache.get("k1").map(String::as_str), Some("1234"));
/// assert_eq!(cache.nbytes(), 9);
/// ```
pub struct LruCache<V> {
    config: LruCacheConfig,
    nbytes: u64,
    list: UsageList<(String, V)>,
    map: HashMap<String, Slot<V>>,
    on_evicted: Option<EvictionCallback<V>>,
    metrics: CoreCacheMetrics,
}

// SAFETY: the store owns every node its raw pointers refer to, and the eviction
// callback is itself `Send`.
unsafe impl<V: Send> Send for LruCache<V> {}

impl<V: Weighted> LruCache<V> {
    /// Creates a store with the given byte budget (`0` = unbounded) and no
    /// eviction callback.
    pub fn new(max_bytes: u64) -> Self {
        Self::init(LruCacheConfig { max_bytes }, None)
    }

    /// Creates a store from a configuration and an optional eviction callback.
    pub fn init(config: LruCacheConfig, on_evicted: Option<EvictionCallback<V>>) -> Self {
        LruCache {
            config,
            nbytes: 0,
            list: UsageList::new(),
            map: HashMap::new(),
            on_evicted,
            metrics: CoreCacheMetrics::new(config.max_bytes),
        }
    }

    /// The configured byte budget; `0` means unbounded.
    #[inline]
    pub fn max_bytes(&self) -> u64 {
        self.config.max_bytes
    }

    /// Total size of all entries currently held.
    #[inline]
    pub fn nbytes(&self) -> u64 {
        self.nbytes
    }

    /// Number of entries currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if the store holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Looks up `key` and, on a hit, marks it as the most recently used entry.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let Some(&node) = self.map.get(key) else {
            self.metrics.record_miss();
            return None;
        };
        self.metrics.record_hit();
        // SAFETY: every pointer in `map` refers to a node linked into `list`.
        unsafe {
            self.list.move_to_front(node);
            Some(&node.as_ref().value().1)
        }
    }

    /// Inserts or replaces the value for `key`, marks it as the most recently
    /// used entry, then evicts from the least recently used end until the
    /// store fits its budget again.
    ///
    /// Replacing a value adjusts the total by the difference in size.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let new_weight = value.weight() as u64;

        if let Some(mut node) = self.map.get(key.as_str()).copied() {
            // SAFETY: every pointer in `map` refers to a node linked into `list`,
            // and no other reference into the node is alive.
            let old_weight = unsafe {
                self.list.move_to_front(node);
                let slot = &mut node.as_mut().value_mut().1;
                std::mem::replace(slot, value).weight() as u64
            };
            self.nbytes = self.nbytes + new_weight - old_weight;
            self.metrics.record_size_change(old_weight, new_weight);
        } else {
            let size = key.len() as u64 + new_weight;
            let node = self.list.push_front((key.clone(), value));
            self.map.insert(key, node);
            self.nbytes += size;
            self.metrics.record_insertion(size);
        }

        self.evict_to_budget();
    }

    /// Removes `key` without invoking the eviction callback.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let node = self.map.remove(key)?;
        // SAFETY: the pointer came from `map`, so it is linked into `list`.
        let (key, value) = unsafe { self.list.remove(node)?.into_value() };
        self.nbytes -= (key.len() + value.weight()) as u64;
        self.metrics.record_removal((key.len() + value.weight()) as u64);
        Some(value)
    }

    /// Evicts the least recently used entry, invoking the eviction callback.
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let node = self.list.pop_back()?;
        // SAFETY: pop_back only yields value nodes.
        let (key, value) = unsafe { node.into_value() };
        self.map.remove(key.as_str());
        let size = (key.len() + value.weight()) as u64;
        self.nbytes -= size;
        self.metrics.record_eviction(size);
        tracing::trace!(key = %key, size, "evicted entry");
        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(&key, &value);
        }
        Some((key, value))
    }

    /// Evicts every entry, invoking the eviction callback for each one.
    pub fn clear(&mut self) {
        while self.remove_oldest().is_some() {}
    }

    /// Returns a snapshot of the store's counters.
    pub fn core_metrics(&self) -> &CoreCacheMetrics {
        &self.metrics
    }

    fn evict_to_budget(&mut self) {
        let max_bytes = self.config.max_bytes;
        while max_bytes != 0 && self.nbytes > max_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }
}

impl<V: Weighted> CacheMetrics for LruCache<V> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LRU"
    }
}

impl<V> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("max_bytes", &self.config.max_bytes)
            .field("nbytes", &self.nbytes)
            .field("len", &self.list.len())
            .finish()
    }
}
