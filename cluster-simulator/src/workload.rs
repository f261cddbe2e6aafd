//! Synthetic request streams.
//!
//! A workload mixes two populations of keys: a small set of popular objects
//! that receives most of the traffic with a Zipf-like skew, and a long tail of
//! regular objects requested uniformly. Streams are generated from a seed so
//! that runs can be compared.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Parameters of a generated workload
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Total number of requests
    pub requests: usize,
    /// Number of unique objects
    pub unique_objects: u32,
    /// Percentage of traffic going to popular objects
    pub popular_traffic_percent: u8,
    /// Percentage of objects considered popular
    pub popular_objects_percent: u8,
    /// Random seed
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            requests: 20_000,
            unique_objects: 5_000,
            popular_traffic_percent: 80,
            popular_objects_percent: 20,
            seed: 42,
        }
    }
}

/// One client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Node index the client sends the request to
    pub node: usize,
    /// Requested key
    pub key: String,
}

/// Generates the request stream for a cluster of `nodes` nodes. Clients pick
/// the node they talk to at random, independent of key ownership.
pub fn generate(config: &WorkloadConfig, nodes: usize) -> Vec<Request> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let nodes = nodes.max(1);

    let popular_objects = ((config.unique_objects as f64 * config.popular_objects_percent as f64
        / 100.0) as u32)
        .max(1);
    let regular_objects = config.unique_objects.saturating_sub(popular_objects).max(1);
    let popular_probability = config.popular_traffic_percent as f64 / 100.0;

    // Skewness of the popular set
    let zipf_s = 0.9;

    (0..config.requests)
        .map(|_| {
            let key = if rng.gen::<f64>() < popular_probability {
                let rank = rng.gen_range(0..popular_objects);
                let zipf_factor = 1.0 / ((rank + 1) as f64).powf(zipf_s);
                let index = if rng.gen::<f64>() < zipf_factor * 0.8 {
                    // Top 10% of the popular set
                    rank % (popular_objects / 10).max(1)
                } else {
                    rank
                };
                format!("popular_obj_{index}")
            } else {
                format!("regular_obj_{}", rng.gen_range(0..regular_objects))
            };
            Request {
                node: rng.gen_range(0..nodes),
                key,
            }
        })
        .collect()
}

/// Object size for `key`, stable across runs, between `min` and `max` bytes.
pub fn object_size(key: &str, min: usize, max: usize) -> usize {
    if max <= min {
        return min;
    }
    // FNV-1a
    let hash = key.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    });
    min + (hash % (max - min + 1) as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generation_is_seeded() {
        let config = WorkloadConfig {
            requests: 500,
            ..Default::default()
        };
        assert_eq!(generate(&config, 3), generate(&config, 3));
    }

    #[test]
    fn test_popular_share() {
        let config = WorkloadConfig {
            requests: 10_000,
            ..Default::default()
        };
        let requests = generate(&config, 4);
        let popular = requests
            .iter()
            .filter(|request| request.key.starts_with("popular_"))
            .count();
        // 80% nominal share
        assert!(popular > 7_500 && popular < 8_500, "{popular}");
        assert!(requests.iter().all(|request| request.node < 4));

        let unique: HashSet<_> = requests.iter().map(|request| &request.key).collect();
        assert!(unique.len() <= config.unique_objects as usize);
    }

    #[test]
    fn test_object_size_bounds() {
        for i in 0..1000 {
            let size = object_size(&format!("k{i}"), 100, 200);
            assert!((100..=200).contains(&size));
        }
        assert_eq!(object_size("k", 10, 10), 10);
        assert_eq!(object_size("k", 7, 42), object_size("k", 7, 42));
    }
}
