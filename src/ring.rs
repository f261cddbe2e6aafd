//! Consistent hashing over peer identities.
//!
//! Each peer is placed on a 32-bit ring at `replicas` positions, the hash of
//! `"{index}{peer}"` for every index below `replicas`. A key belongs to the
//! peer owning the first position at or after the key's hash, wrapping around
//! to the lowest position. Spreading each peer over many virtual positions
//! evens out the share of keys per peer, and when a peer joins or leaves only
//! about `1 / peers` of all keys change owner.
//!
//! Virtual-node names of different peers can hash to the same position (and
//! `"11" + "1"` spells the same name as `"1" + "11"`). Such a position belongs
//! to the smallest peer identity, so ownership depends only on the member set
//! and never on the order peers were added in.
//!
//! The ring is immutable once shared: callers that need to change membership
//! build a fresh ring and swap it in (see [`PeerPool`](crate::PeerPool)).

use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use crate::config::HashRingConfig;

/// Hash function mapping bytes onto the ring.
pub type Hash = fn(&[u8]) -> u32;

/// The default ring hash: CRC-32C (Castagnoli).
pub fn crc32c_hash(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// A consistent-hash ring mapping keys to peer identities.
///
/// # Examples
///
/// ```
/// use peercache::HashRing;
///
/// let mut ring = HashRing::new(50);
/// ring.add(["http://10.0.0.1:8001", "http://10.0.0.2:8001"]);
///
/// let owner = ring.get("user:42").unwrap();
/// // Lookups are deterministic.
/// assert_eq!(ring.get("user:42"), Some(owner));
/// ```
#[derive(Clone)]
pub struct HashRing {
    hash: Hash,
    replicas: usize,
    members: BTreeSet<String>,
    positions: Vec<u32>,
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Creates an empty ring using the default CRC-32C hash.
    pub fn new(replicas: usize) -> Self {
        Self::init(HashRingConfig {
            replicas,
            ..Default::default()
        })
    }

    /// Creates an empty ring from a configuration.
    pub fn init(config: HashRingConfig) -> Self {
        HashRing {
            hash: config.hash,
            replicas: config.replicas,
            members: BTreeSet::new(),
            positions: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Number of virtual positions per peer.
    #[inline]
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Total number of positions on the ring.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if no peer has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Registers peer identities. Adding an identity that is already a member
    /// changes nothing.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.members.len();
        self.members.extend(peers.into_iter().map(Into::into));
        if self.members.len() != before {
            self.rebuild();
        }
    }

    /// Recomputes every position from the member set. Members are visited in
    /// ascending order, so a contested position keeps its first (smallest)
    /// owner.
    fn rebuild(&mut self) {
        self.owners.clear();
        for peer in &self.members {
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{i}{peer}").as_bytes());
                self.owners.entry(position).or_insert_with(|| peer.clone());
            }
        }
        self.positions = self.owners.keys().copied().collect();
        self.positions.sort_unstable();
    }

    /// Returns the peer owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.positions.partition_point(|&position| position < hash);
        let position = self.positions[idx % self.positions.len()];
        self.owners.get(&position).map(String::as_str)
    }

    /// Member identities, sorted.
    pub fn peers(&self) -> Vec<&str> {
        self.members.iter().map(String::as_str).collect()
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("members", &self.members.len())
            .field("positions", &self.positions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Treats the input as a decimal number so ring positions are predictable.
    fn decimal_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data).unwrap().parse().unwrap()
    }

    fn decimal_ring() -> HashRing {
        HashRing::init(HashRingConfig {
            replicas: 3,
            hash: decimal_hash,
        })
    }

    #[test]
    fn test_ring_lookup_and_wraparound() {
        let mut ring = decimal_ring();
        // Positions: 2, 4, 6, 12, 14, 16, 22, 24, 26
        ring.add(["6", "4", "2"]);
        assert_eq!(ring.len(), 9);

        for (key, owner) in [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")] {
            assert_eq!(ring.get(key), Some(owner), "key {key}");
        }

        // Adds 8, 18, 28
        ring.add(["8"]);
        assert_eq!(ring.get("27"), Some("8"));
    }

    #[test]
    fn test_ring_empty() {
        let ring = HashRing::new(50);
        assert!(ring.is_empty());
        assert_eq!(ring.get("anything"), None);
        assert!(ring.peers().is_empty());
    }

    #[test]
    fn test_ring_readd_is_idempotent() {
        let mut ring = decimal_ring();
        ring.add(["6", "4"]);
        let before = ring.len();
        ring.add(["6"]);
        assert_eq!(ring.len(), before);
        assert_eq!(ring.peers(), vec!["4", "6"]);
    }

    #[test]
    fn test_ring_contested_position_goes_to_smallest_peer() {
        let mut ring = decimal_ring();
        // "1" + "1" and "0" + "11" both name position 11.
        ring.add(["1", "11"]);
        assert_eq!(ring.get("11"), Some("1"));

        let mut reversed = decimal_ring();
        reversed.add(["11"]);
        reversed.add(["1"]);
        assert_eq!(reversed.get("11"), Some("1"));
        assert_eq!(ring.len(), reversed.len());
    }

    #[test]
    fn test_ring_readd_keeps_every_owner() {
        let mut ring = HashRing::new(50);
        ring.add(["1", "11"]);
        let keys: Vec<String> = (0..20_000).map(|i| format!("key-{i}")).collect();
        let before: Vec<Option<String>> =
            keys.iter().map(|key| ring.get(key).map(String::from)).collect();
        let positions = ring.len();

        ring.add(["1"]);
        ring.add(["11", "1"]);

        assert_eq!(ring.len(), positions);
        for (key, owner) in keys.iter().zip(&before) {
            assert_eq!(ring.get(key), owner.as_deref(), "key {key}");
        }
    }

    #[test]
    fn test_ring_default_hash_is_deterministic() {
        let peers = ["alpha", "beta", "gamma"];
        let mut a = HashRing::new(50);
        let mut b = HashRing::new(50);
        a.add(peers);
        b.add(peers.iter().rev().copied());
        for i in 0..1000 {
            let key = format!("key-{i}");
            assert_eq!(a.get(&key), b.get(&key));
        }
    }

    #[test]
    fn test_crc32c_hash_is_fixed() {
        // Standard CRC-32C check value.
        assert_eq!(crc32c_hash(b"123456789"), 0xE306_9283);
    }
}
