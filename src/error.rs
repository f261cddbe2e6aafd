//! Error types shared by every layer of the cache.
//!
//! A single [`Error`] enum covers validation failures, origin failures, peer
//! failures and caller bugs. It is `Clone` because the result of a
//! deduplicated load is handed to every caller waiting on the same key.

use std::error::Error as StdError;
use std::sync::Arc;

/// Boxed error returned by origin callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while serving a key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The requested key was empty. Rejected before any lookup.
    #[error("key is required")]
    EmptyKey,

    /// The origin callback failed. Displayed exactly as the origin reported it.
    #[error("{0}")]
    Origin(Arc<dyn StdError + Send + Sync + 'static>),

    /// A peer answered with a status other than `200 OK`.
    #[error("server returned: {status} {status_text}")]
    PeerStatus {
        /// HTTP status code
        status: u16,
        /// Reason phrase sent along with the status
        status_text: String,
    },

    /// A peer could not be reached or its response could not be read.
    #[error("peer request failed: {0}")]
    PeerRequest(String),

    /// No namespace with this name is registered.
    #[error("no such group: {0}")]
    NoSuchGroup(String),

    /// A peer request did not match the wire format.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller executing a deduplicated load unwound before producing a result.
    #[error("load for key was abandoned before completing")]
    LoadAbandoned,

    /// Caller bug: peers were registered on a group more than once.
    #[error("register_peers called more than once")]
    PeersAlreadyRegistered,

    /// Caller bug: a group with this name already exists in the registry.
    #[error("duplicate registration of group {0}")]
    DuplicateGroup(String),
}

impl Error {
    /// Wraps an origin failure.
    pub fn origin(err: BoxError) -> Self {
        Error::Origin(Arc::from(err))
    }

    /// Returns `true` for errors caused by misuse of the API rather than by
    /// runtime conditions. These must never be reachable from untrusted input.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Error::PeersAlreadyRegistered | Error::DuplicateGroup(_)
        )
    }

    /// Returns `true` if the error originated from talking to a peer.
    pub fn is_peer_error(&self) -> bool {
        matches!(self, Error::PeerStatus { .. } | Error::PeerRequest(_))
    }
}
