//! Configuration for the peer pool.

use core::fmt;
use std::time::Duration;

use super::HashRingConfig;

/// Path prefix under which peers serve cache requests.
pub const DEFAULT_BASE_PATH: &str = "/_peercache/";

/// Configuration for a [`PeerPool`](crate::PeerPool).
#[derive(Clone)]
pub struct PeerPoolConfig {
    /// Base URL of this node, e.g. `http://10.0.0.1:8001`. Keys the ring maps
    /// to this identity are served locally.
    pub self_url: String,
    /// Path prefix of the wire protocol. Must start and end with `/`.
    pub base_path: String,
    /// Ring settings; must match on every peer.
    pub ring: HashRingConfig,
    /// Timeout applied to each remote fetch. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl PeerPoolConfig {
    /// Creates a configuration for the node reachable at `self_url`.
    pub fn new(self_url: impl Into<String>) -> Self {
        PeerPoolConfig {
            self_url: self_url.into(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            ring: HashRingConfig::default(),
            timeout: None,
        }
    }
}

impl fmt::Debug for PeerPoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerPoolConfig")
            .field("self_url", &self.self_url)
            .field("base_path", &self.base_path)
            .field("ring", &self.ring)
            .field("timeout", &self.timeout)
            .finish()
    }
}
