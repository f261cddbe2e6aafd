//! Peer pool.
//!
//! A [`PeerPool`] is one node's view of the cluster. It picks the owner of a
//! key on a [`HashRing`] of peer base URLs, hands out a [`PeerGetter`] for
//! remote owners, and answers requests from other peers through
//! [`PeerPool::handle`].
//!
//! Membership changes build a complete new ring and getter map, then replace
//! the shared snapshot in one step. Lookups clone the current snapshot and
//! never observe a half-built ring.
//!
//! The pool does not bind a socket. An HTTP server passes each request path
//! to [`handle`](PeerPool::handle) and writes back the [`PeerResponse`], as
//! the `peer_server` example does with axum. Tests and simulations call it
//! directly.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use crate::config::PeerPoolConfig;
use crate::error::{Error, Result};
use crate::http::{self, CONTENT_TYPE_OCTET_STREAM, CONTENT_TYPE_TEXT};
use crate::metrics::GroupStats;
use crate::peers::{PeerGetter, PeerPicker};
use crate::registry::Registry;
use crate::ring::HashRing;

/// Builds the getter for a peer from its base URL.
pub type Connector = Box<dyn Fn(&str) -> Arc<dyn PeerGetter> + Send + Sync>;

/// Response to a peer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerResponse {
    /// HTTP status code
    pub status: u16,
    /// Value of the `Content-Type` header
    pub content_type: &'static str,
    /// Raw value on success, error text otherwise
    pub body: Vec<u8>,
}

impl PeerResponse {
    fn ok(body: Vec<u8>) -> Self {
        PeerResponse {
            status: 200,
            content_type: CONTENT_TYPE_OCTET_STREAM,
            body,
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        PeerResponse {
            status,
            content_type: CONTENT_TYPE_TEXT,
            body: message.into().into_bytes(),
        }
    }

    /// Reason phrase of the status code.
    pub fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "",
        }
    }

    /// Interprets the response the way a remote client does: the body of a
    /// `200`, or [`Error::PeerStatus`] for anything else.
    pub fn into_result(self) -> Result<Vec<u8>> {
        if self.status == 200 {
            Ok(self.body)
        } else {
            Err(Error::PeerStatus {
                status: self.status,
                status_text: self.status_text().to_string(),
            })
        }
    }
}

/// An immutable membership snapshot.
struct PeerSet {
    ring: HashRing,
    getters: HashMap<String, Arc<dyn PeerGetter>>,
}

/// Routes keys to peers and serves requests from them.
///
/// # Example
///
/// ```
/// use peercache::config::{GroupConfig, PeerPoolConfig};
/// use peercache::group::getter_fn;
/// use peercache::{PeerGetter, PeerPicker, PeerPool, Registry, Result};
/// use std::sync::Arc;
///
/// struct Unreachable;
///
/// impl PeerGetter for Unreachable {
///     fn get(&self, _group: &str, _key: &str) -> Result<Vec<u8>> {
///         Err(peercache::Error::PeerRequest("offline".into()))
///     }
/// }
///
/// let registry = Arc::new(Registry::new());
/// registry
///     .new_group(GroupConfig::new("scores"), getter_fn(|_| Ok(b"630".to_vec())))
///     .unwrap();
///
/// let pool = PeerPool::with_connector(
///     PeerPoolConfig::new("http://node-a"),
///     Arc::clone(&registry),
///     |_peer| Arc::new(Unreachable) as Arc<dyn PeerGetter>,
/// );
/// pool.set_peers(["http://node-a"]);
///
/// // A one-node cluster owns every key itself.
/// assert!(pool.pick_peer("Tom").is_none());
///
/// let response = pool.handle("/_peercache/scores/Tom");
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body, b"630");
/// assert_eq!(pool.handle("/_peercache/nope/Tom").status, 404);
/// ```
pub struct PeerPool {
    config: PeerPoolConfig,
    registry: Arc<Registry>,
    connector: Connector,
    peers: RwLock<Arc<PeerSet>>,
}

impl PeerPool {
    /// Creates a pool that reaches peers over HTTP.
    #[cfg(feature = "http")]
    pub fn new(config: PeerPoolConfig, registry: Arc<Registry>) -> Self {
        let base_path = config.base_path.clone();
        let timeout = config.timeout;
        Self::with_connector(config, registry, move |peer| {
            Arc::new(http::HttpGetter::new(format!("{peer}{base_path}"), timeout))
                as Arc<dyn PeerGetter>
        })
    }

    /// Creates a pool whose getters are built by `connector`.
    pub fn with_connector<C>(config: PeerPoolConfig, registry: Arc<Registry>, connector: C) -> Self
    where
        C: Fn(&str) -> Arc<dyn PeerGetter> + Send + Sync + 'static,
    {
        let peers = Arc::new(PeerSet {
            ring: HashRing::init(config.ring),
            getters: HashMap::new(),
        });
        PeerPool {
            config,
            registry,
            connector: Box::new(connector),
            peers: RwLock::new(peers),
        }
    }

    /// Base URL of this node.
    #[inline]
    pub fn self_url(&self) -> &str {
        &self.config.self_url
    }

    /// The pool's configuration.
    #[inline]
    pub fn config(&self) -> &PeerPoolConfig {
        &self.config
    }

    /// The registry requests are resolved against.
    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Replaces the cluster membership. The list should include this node's
    /// own URL so that it keeps its share of the keys.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();

        let mut ring = HashRing::init(self.config.ring);
        ring.add(peers.iter().cloned());
        let getters = peers
            .iter()
            .map(|peer| (peer.clone(), (self.connector)(peer)))
            .collect();

        *self.peers.write() = Arc::new(PeerSet { ring, getters });
        info!(self_url = %self.config.self_url, peers = peers.len(), "peer set updated");
    }

    /// Current members, sorted.
    pub fn peers(&self) -> Vec<String> {
        let peers = Arc::clone(&self.peers.read());
        peers.ring.peers().into_iter().map(String::from).collect()
    }

    /// Serves a peer request for `path`, which must be
    /// `<base path><group>/<key>` with percent-encoded segments.
    pub fn handle(&self, path: &str) -> PeerResponse {
        info!(self_url = %self.config.self_url, method = "GET", path, "serving peer request");

        let Some(rest) = path.strip_prefix(self.config.base_path.as_str()) else {
            return PeerResponse::error(400, format!("unexpected path: {path}"));
        };
        let Some((group_name, key)) = rest.split_once('/') else {
            return PeerResponse::error(400, "bad request");
        };
        let (group_name, key) = match (http::unescape(group_name), http::unescape(key)) {
            (Ok(group_name), Ok(key)) => (group_name, key),
            (Err(err), _) | (_, Err(err)) => return PeerResponse::error(400, err.to_string()),
        };

        let Some(group) = self.registry.get_group(&group_name) else {
            return PeerResponse::error(404, Error::NoSuchGroup(group_name).to_string());
        };
        GroupStats::incr(&group.stats().server_requests);

        match group.get(&key) {
            Ok(view) => PeerResponse::ok(view.byte_slice()),
            Err(err) => PeerResponse::error(500, err.to_string()),
        }
    }
}

impl PeerPicker for PeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let peers = Arc::clone(&self.peers.read());
        let owner = peers.ring.get(key)?;
        if owner == self.config.self_url {
            return None;
        }
        debug!(self_url = %self.config.self_url, peer = owner, key, "picked peer");
        peers.getters.get(owner).cloned()
    }
}

impl fmt::Debug for PeerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerPool")
            .field("config", &self.config)
            .field("peers", &self.peers())
            .finish()
    }
}
