//! Cache Configuration Module
//!
//! Configuration structures for every component. Each struct has public
//! fields plus a `Default` (or a `new` taking the one required field)
//! carrying the stock settings, so callers can spell out only what differs:
//!
//! | Config | Used by | Description |
//! |--------|---------|-------------|
//! | `LruCacheConfig` | [`LruCache`](crate::LruCache) | Byte budget of an eviction store |
//! | `HashRingConfig` | [`HashRing`](crate::HashRing) | Virtual replicas and hash function |
//! | `GroupConfig` | [`Group`](crate::Group) | Name, cache budget and peer-result policy |
//! | `PeerPoolConfig` | [`PeerPool`](crate::PeerPool) | Self identity, wire base path, ring, timeouts |
//!
//! # Examples
//!
//! ```
//! use peercache::config::{GroupConfig, HashRingConfig};
//!
//! let group = GroupConfig {
//!     cache_bytes: 2 << 10,
//!     ..GroupConfig::new("scores")
//! };
//! assert_eq!(group.name, "scores");
//!
//! let ring = HashRingConfig {
//!     replicas: 100,
//!     ..Default::default()
//! };
//! assert_eq!(ring.replicas, 100);
//! ```

pub mod group;
pub mod lru;
pub mod pool;
pub mod ring;

pub use group::GroupConfig;
pub use lru::LruCacheConfig;
pub use pool::PeerPoolConfig;
pub use ring::HashRingConfig;
