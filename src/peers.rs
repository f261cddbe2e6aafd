//! Peer seams.
//!
//! A [`Group`](crate::Group) never talks to the network directly. It asks a
//! [`PeerPicker`] which peer owns a key and, if the owner is remote, fetches
//! the value through that peer's [`PeerGetter`]. [`PeerPool`](crate::PeerPool)
//! implements the picker on top of a [`HashRing`](crate::HashRing), and
//! [`HttpGetter`](crate::http::HttpGetter) implements the getter over HTTP.
//! Tests plug in their own implementations of either side.

use std::sync::Arc;

use crate::error::Result;

/// Locates the peer that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the remote owner of `key`, or `None` if the key should be
    /// loaded locally: the current node owns it, or no peers are known.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// Fetches a value for `(group, key)` from one remote peer.
pub trait PeerGetter: Send + Sync {
    /// Returns the raw value bytes, or an error describing why the peer could
    /// not supply them.
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>>;
}

/// A picker that never selects a peer, so every load stays local.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl PeerGetter for Echo {
        fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
            Ok(format!("{group}/{key}").into_bytes())
        }
    }

    struct Always(Arc<dyn PeerGetter>);

    impl PeerPicker for Always {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
            Some(Arc::clone(&self.0))
        }
    }

    #[test]
    fn test_no_peers_never_picks() {
        assert!(NoPeers.pick_peer("anything").is_none());
    }

    #[test]
    fn test_picker_as_trait_object() {
        let picker: Arc<dyn PeerPicker> = Arc::new(Always(Arc::new(Echo)));
        let getter = picker.pick_peer("k").unwrap();
        assert_eq!(getter.get("scores", "k").unwrap(), b"scores/k");
    }
}
