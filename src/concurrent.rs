//! Concurrent Cache
//!
//! A thread-safe wrapper around [`LruCache<ByteView>`](crate::LruCache) used as
//! the local cache of every [`Group`](crate::Group).
//!
//! # Why Mutex Instead of RwLock?
//!
//! A lookup in an LRU store moves the entry to the front of the recency list,
//! so `get` mutates just like `add` does. An `RwLock` would hand out write
//! locks for every call anyway; `parking_lot::Mutex` is the cheaper primitive.
//!
//! # Lazy Initialization
//!
//! The inner store is created by the first `add`. Until then `get` returns
//! `None` without allocating, so groups that are registered but never used
//! cost almost nothing.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │             ConcurrentCache               │
//! │  ┌─────────────────────────────────────┐  │
//! │  │ Mutex                               │  │
//! │  │  ┌───────────────────────────────┐  │  │
//! │  │  │ Option<LruCache<ByteView>>    │  │  │
//! │  │  └───────────────────────────────┘  │  │
//! │  └─────────────────────────────────────┘  │
//! └───────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::config::LruCacheConfig;
use crate::lru::LruCache;
use crate::metrics::{CacheMetrics, CoreCacheMetrics};

/// A mutex-guarded, lazily created byte-budgeted LRU store of [`ByteView`]s.
///
/// # Example
///
/// ```
/// use peercache::{ByteView, ConcurrentCache};
/// use std::sync::Arc;
/// use std::thread;
///
/// let cache = Arc::new(ConcurrentCache::new(1 << 20));
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let cache = Arc::clone(&cache);
///         thread::spawn(move || {
///             let key = format!("key_{t}");
///             cache.add(&key, ByteView::from("value"));
///             assert_eq!(cache.get(&key).unwrap(), "value");
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(cache.len(), 4);
/// ```
pub struct ConcurrentCache {
    config: LruCacheConfig,
    inner: Mutex<Option<LruCache<ByteView>>>,
}

impl ConcurrentCache {
    /// Creates an empty cache with a byte budget (`0` = unbounded).
    pub fn new(max_bytes: u64) -> Self {
        Self::init(LruCacheConfig { max_bytes })
    }

    /// Creates an empty cache from a configuration.
    pub fn init(config: LruCacheConfig) -> Self {
        ConcurrentCache {
            config,
            inner: Mutex::new(None),
        }
    }

    /// Inserts or replaces `key`, creating the store on first use.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut inner = self.inner.lock();
        inner
            .get_or_insert_with(|| LruCache::init(self.config, None))
            .add(key, value);
    }

    /// Looks up `key`. The returned view shares the cached bytes.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut inner = self.inner.lock();
        inner.as_mut()?.get(key).cloned()
    }

    /// The configured byte budget.
    pub fn max_bytes(&self) -> u64 {
        self.config.max_bytes
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, LruCache::len)
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes currently held (keys plus values).
    pub fn nbytes(&self) -> u64 {
        self.inner.lock().as_ref().map_or(0, LruCache::nbytes)
    }

    /// Evicts every entry. The store stays allocated.
    pub fn clear(&self) {
        if let Some(lru) = self.inner.lock().as_mut() {
            lru.clear();
        }
    }

    /// Returns a copy of the store's counters.
    pub fn core_metrics(&self) -> CoreCacheMetrics {
        self.inner.lock().as_ref().map_or_else(
            || CoreCacheMetrics::new(self.config.max_bytes),
            |lru| lru.core_metrics().clone(),
        )
    }
}

impl CacheMetrics for ConcurrentCache {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.core_metrics().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "ConcurrentLRU"
    }
}

impl fmt::Debug for ConcurrentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ConcurrentCache")
            .field("max_bytes", &self.config.max_bytes)
            .field("initialized", &inner.is_some())
            .field("len", &inner.as_ref().map_or(0, LruCache::len))
            .finish()
    }
}
