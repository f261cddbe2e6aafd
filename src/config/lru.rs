//! Configuration for the byte-budgeted LRU store.
//!
//! The budget counts the length of every key plus the weight of its value.
//! There is no separate entry-count limit.

use core::fmt;

/// Configuration for an [`LruCache`](crate::LruCache).
///
/// # Examples
///
/// ```
/// use peercache::config::LruCacheConfig;
/// use peercache::LruCache;
///
/// let config = LruCacheConfig {
///     max_bytes: 64 * 1024 * 1024,
/// };
/// let cache: LruCache<Vec<u8>> = LruCache::init(config, None);
/// assert_eq!(cache.max_bytes(), 64 * 1024 * 1024);
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct LruCacheConfig {
    /// Maximum total size in bytes of keys plus values. `0` disables eviction.
    pub max_bytes: u64,
}

impl fmt::Debug for LruCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCacheConfig")
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}
