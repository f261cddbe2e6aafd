//! Cache namespaces.
//!
//! A [`Group`] binds a name to an origin [`Getter`], a byte-budgeted local
//! cache and, optionally, a [`PeerPicker`]. [`Group::get`] serves a key in
//! this order:
//!
//! 1. empty keys are rejected;
//! 2. the local cache is consulted;
//! 3. on a miss, one deduplicated load per key runs: the owning peer is asked
//!    first when it is remote, and the origin is used if no peer owns the key
//!    or the peer fails.
//!
//! Only values loaded from the origin are cached by default. Values fetched
//! from a peer are cached too when [`GroupConfig::cache_peer_loads`] is set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::byteview::ByteView;
use crate::concurrent::ConcurrentCache;
use crate::config::GroupConfig;
use crate::error::{BoxError, Error, Result};
use crate::metrics::{CacheMetrics, GroupStats};
use crate::peers::{PeerGetter, PeerPicker};
use crate::singleflight;

/// Loads the value for a key from the system of record.
///
/// Called only on a cache miss that no peer could serve, at most once at a
/// time per key on this node.
pub trait Getter: Send + Sync {
    /// Returns the bytes for `key`. An error is propagated to the caller of
    /// [`Group::get`] unchanged and nothing is cached.
    fn get(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError>;
}

/// A [`Getter`] backed by a closure. Built with [`getter_fn`].
pub struct GetterFn<F>(F);

impl<F> Getter for GetterFn<F>
where
    F: Fn(&str) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn get(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError> {
        (self.0)(key)
    }
}

/// Wraps a closure as a [`Getter`].
///
/// ```
/// use peercache::group::getter_fn;
/// use peercache::Getter;
///
/// let origin = getter_fn(|key| match key {
///     "Tom" => Ok(b"630".to_vec()),
///     _ => Err(format!("{key} not exist").into()),
/// });
/// assert_eq!(origin.get("Tom").unwrap(), b"630");
/// assert!(origin.get("Sam").is_err());
/// ```
pub fn getter_fn<F>(f: F) -> GetterFn<F>
where
    F: Fn(&str) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync,
{
    GetterFn(f)
}

/// A named cache namespace.
///
/// # Example
///
/// ```
/// use peercache::config::GroupConfig;
/// use peercache::group::getter_fn;
/// use peercache::Group;
///
/// let scores = Group::new(
///     GroupConfig {
///         cache_bytes: 2 << 10,
///         ..GroupConfig::new("scores")
///     },
///     getter_fn(|key| Ok(key.to_uppercase().into_bytes())),
/// );
///
/// assert_eq!(scores.get("tom").unwrap(), "TOM");
/// assert!(scores.get("").is_err());
/// ```
pub struct Group {
    config: GroupConfig,
    getter: Box<dyn Getter>,
    main_cache: ConcurrentCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    loader: singleflight::Group<ByteView>,
    stats: GroupStats,
}

impl Group {
    /// Creates a group. Most callers go through
    /// [`Registry::new_group`](crate::Registry::new_group) so that peers can
    /// find the group by name.
    pub fn new(config: GroupConfig, getter: impl Getter + 'static) -> Self {
        Group {
            main_cache: ConcurrentCache::new(config.cache_bytes),
            config,
            getter: Box::new(getter),
            peers: OnceLock::new(),
            loader: singleflight::Group::new(),
            stats: GroupStats::default(),
        }
    }

    /// The group's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The group's configuration.
    #[inline]
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// The group's counters.
    #[inline]
    pub fn stats(&self) -> &GroupStats {
        &self.stats
    }

    /// The local cache.
    #[inline]
    pub fn main_cache(&self) -> &ConcurrentCache {
        &self.main_cache
    }

    /// Installs the peer picker used to route loads.
    ///
    /// A group accepts one picker for its lifetime; a second call returns
    /// [`Error::PeersAlreadyRegistered`].
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers
            .set(peers)
            .map_err(|_| Error::PeersAlreadyRegistered)
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Result<ByteView> {
        GroupStats::incr(&self.stats.gets);
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(value) = self.main_cache.get(key) {
            GroupStats::incr(&self.stats.cache_hits);
            debug!(group = %self.config.name, key, "cache hit");
            return Ok(value);
        }

        self.load(key)
    }

    fn load(&self, key: &str) -> Result<ByteView> {
        GroupStats::incr(&self.stats.loads);
        self.loader.work(key, || {
            // A previous generation may have filled the cache between our
            // miss and joining the flight.
            if let Some(value) = self.main_cache.get(key) {
                GroupStats::incr(&self.stats.load_cache_hits);
                return Ok(value);
            }
            GroupStats::incr(&self.stats.loads_deduped);
            debug!(group = %self.config.name, key, "loading");

            if let Some(peer) = self.peers.get().and_then(|peers| peers.pick_peer(key)) {
                match self.get_from_peer(peer.as_ref(), key) {
                    Ok(value) => {
                        GroupStats::incr(&self.stats.peer_loads);
                        return Ok(value);
                    }
                    Err(err) => {
                        GroupStats::incr(&self.stats.peer_errors);
                        warn!(
                            group = %self.config.name,
                            key,
                            error = %err,
                            "failed to get from peer, loading locally"
                        );
                    }
                }
            }

            self.get_locally(key)
        })
    }

    fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let value = ByteView::from(peer.get(&self.config.name, key)?);
        if self.config.cache_peer_loads {
            self.main_cache.add(key, value.clone());
        }
        Ok(value)
    }

    fn get_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self.getter.get(key).map_err(|err| {
            GroupStats::incr(&self.stats.local_load_errs);
            Error::origin(err)
        })?;
        GroupStats::incr(&self.stats.local_loads);

        let value = ByteView::copy_from_slice(&bytes);
        self.main_cache.add(key, value.clone());
        Ok(value)
    }
}

impl CacheMetrics for Group {
    /// Group counters, followed by the local cache's counters prefixed with
    /// `main_cache.`.
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.stats.to_btreemap();
        metrics.extend(
            self.main_cache
                .metrics()
                .into_iter()
                .map(|(name, value)| (format!("main_cache.{name}"), value)),
        );
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        "Group"
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("config", &self.config)
            .field("main_cache", &self.main_cache)
            .field("has_peers", &self.peers.get().is_some())
            .finish()
    }
}
