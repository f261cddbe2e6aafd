#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Components
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ Registry                                                             │
//! │   name ──▶ Group                                                     │
//! │              ├── Getter            (origin, supplied by the caller)  │
//! │              ├── ConcurrentCache   (Mutex<LruCache<ByteView>>)       │
//! │              ├── singleflight      (one load per key)                │
//! │              └── PeerPicker ──▶ PeerPool                             │
//! │                                   ├── HashRing  (owner of a key)     │
//! │                                   └── PeerGetter per peer            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ByteView`] | Immutable, cheaply cloned cached value |
//! | [`LruCache`] | Byte-budgeted LRU store, not thread-safe |
//! | [`ConcurrentCache`] | Mutex-guarded, lazily created `LruCache<ByteView>` |
//! | [`HashRing`] | Consistent hashing with virtual replicas |
//! | [`singleflight::Group`] | Duplicate call suppression |
//! | [`Group`] | A cache namespace implementing the get protocol |
//! | [`Registry`] | Name to group lookup for one node |
//! | [`PeerPool`] | Peer selection and request handling for one node |
//!
//! ## Using the LRU store directly
//!
//! ```rust
//! use peercache::config::LruCacheConfig;
//! use peercache::LruCache;
//! use std::sync::{Arc, Mutex};
//!
//! let evicted = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&evicted);
//! let mut cache: LruCache<String> = LruCache::init(
//!     LruCacheConfig { max_bytes: 10 },
//!     Some(Box::new(move |key: &str, _value: &String| {
//!         sink.lock().unwrap().push(key.to_string());
//!     })),
//! );
//!
//! cache.add("key1", "123456".to_string()); // 10 bytes
//! cache.add("k2", "v2".to_string());       // over budget: key1 goes
//!
//! assert!(cache.get("key1").is_none());
//! assert_eq!(*evicted.lock().unwrap(), vec!["key1"]);
//! ```
//!
//! ## Wiring peers
//!
//! ```rust,no_run
//! use peercache::config::{GroupConfig, PeerPoolConfig};
//! use peercache::group::getter_fn;
//! use peercache::{PeerPool, Registry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! let images = registry
//!     .new_group(GroupConfig::new("images"), getter_fn(|key| Ok(key.as_bytes().to_vec())))
//!     .unwrap();
//!
//! let pool = Arc::new(PeerPool::new(
//!     PeerPoolConfig::new("http://10.0.0.1:8001"),
//!     Arc::clone(&registry),
//! ));
//! pool.set_peers(["http://10.0.0.1:8001", "http://10.0.0.2:8001"]);
//! images.register_peers(pool.clone()).unwrap();
//!
//! // An HTTP server on 10.0.0.1:8001 forwards request paths to `pool.handle`,
//! // see `demos/peer_server.rs`.
//! let value = images.get("cat.png").unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`byteview`]: Immutable cached values
//! - [`lru`]: Byte-budgeted LRU store
//! - [`concurrent`]: Thread-safe wrapper around the store
//! - [`ring`]: Consistent-hash ring
//! - [`singleflight`]: Duplicate call suppression
//! - [`group`]: Cache namespaces and the origin `Getter`
//! - [`registry`]: Name to group lookup
//! - [`peers`]: Peer picker and getter traits
//! - [`pool`]: Peer pool
//! - [`http`]: Wire format helpers and the HTTP getter
//! - [`config`]: Configuration structures
//! - [`metrics`]: Metrics collection
//! - [`error`]: Error type

/// Doubly linked list implementation with in-place editing capabilities.
///
/// **Note**: This module is internal infrastructure. It exposes unsafe raw
/// pointer operations that require careful invariant maintenance.
pub(crate) mod list;

/// Immutable byte views.
pub mod byteview;

/// Configuration structures for every component.
pub mod config;

/// Error type shared by the whole crate.
pub mod error;

/// Byte-budgeted Least Recently Used (LRU) store.
///
/// Evicts the least recently used entries until the total size of keys and
/// values fits the configured budget.
pub mod lru;

/// Thread-safe, lazily initialized LRU cache of byte views.
pub mod concurrent;

/// Consistent hashing.
pub mod ring;

/// Duplicate call suppression.
pub mod singleflight;

/// Peer selection and remote fetch traits.
pub mod peers;

/// Cache namespaces.
pub mod group;

/// Name to group lookup.
pub mod registry;

/// Peer pool: ring-based peer selection and peer request handling.
pub mod pool;

/// HTTP wire format.
pub mod http;

/// Cache metrics system.
///
/// Every layer reports its counters through a common interface.
pub mod metrics;

pub use byteview::ByteView;
pub use concurrent::ConcurrentCache;
pub use error::{BoxError, Error, Result};
pub use group::{Getter, Group};
pub use lru::{LruCache, Weighted};
pub use metrics::{CacheMetrics, GroupStats};
pub use peers::{NoPeers, PeerGetter, PeerPicker};
pub use pool::{PeerPool, PeerResponse};
pub use registry::Registry;
pub use ring::HashRing;
