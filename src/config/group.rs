//! Configuration for a cache namespace.

use core::fmt;

/// Configuration for a [`Group`](crate::Group).
#[derive(Clone, PartialEq, Eq)]
pub struct GroupConfig {
    /// Unique name of the group; the registry key and the first path segment
    /// of peer requests.
    pub name: String,
    /// Byte budget of the group's local cache. `0` disables eviction.
    pub cache_bytes: u64,
    /// Also store values fetched from a remote peer in the local cache.
    ///
    /// Off by default: the owning peer caches the value on its side, and
    /// keeping a second copy here trades memory for fewer peer round trips.
    pub cache_peer_loads: bool,
}

impl GroupConfig {
    /// Creates a configuration with the given name and default settings.
    pub fn new(name: impl Into<String>) -> Self {
        GroupConfig {
            name: name.into(),
            cache_bytes: 0,
            cache_peer_loads: false,
        }
    }
}

impl fmt::Debug for GroupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupConfig")
            .field("name", &self.name)
            .field("cache_bytes", &self.cache_bytes)
            .field("cache_peer_loads", &self.cache_peer_loads)
            .finish()
    }
}
