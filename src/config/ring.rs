//! Configuration for the consistent-hash ring.
//!
//! Every peer in a cluster must use the same replica count and hash function,
//! otherwise they disagree about who owns a key.

use core::fmt;

use crate::ring::{crc32c_hash, Hash};

/// Virtual nodes per peer used when nothing else is configured.
pub const DEFAULT_REPLICAS: usize = 50;

/// Configuration for a [`HashRing`](crate::HashRing).
#[derive(Clone, Copy)]
pub struct HashRingConfig {
    /// Ring positions generated per peer identity.
    pub replicas: usize,
    /// Hash applied to keys and virtual-node names.
    pub hash: Hash,
}

impl Default for HashRingConfig {
    fn default() -> Self {
        HashRingConfig {
            replicas: DEFAULT_REPLICAS,
            hash: crc32c_hash,
        }
    }
}

impl fmt::Debug for HashRingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRingConfig")
            .field("replicas", &self.replicas)
            .finish_non_exhaustive()
    }
}
