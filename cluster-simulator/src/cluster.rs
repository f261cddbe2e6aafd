//! In-process cluster.
//!
//! Every simulated node owns a registry with one group and a peer pool. Peer
//! requests are delivered by calling the target node's `PeerPool::handle`
//! with the wire path, so the simulation runs the same routing and error
//! handling as a networked deployment. Nodes can be marked down to watch
//! loads fall back to the local origin.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use peercache::config::{GroupConfig, PeerPoolConfig};
use peercache::group::getter_fn;
use peercache::http::escape;
use peercache::{Error, Group, PeerGetter, PeerPool, Registry, Result};
use tracing::{debug, info};

use crate::stats::{NodeReport, RunReport};
use crate::workload::{object_size, Request};

/// Name of the simulated group
pub const GROUP_NAME: &str = "objects";

/// Cluster parameters
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Number of nodes
    pub nodes: usize,
    /// Byte budget of each node's group cache
    pub cache_bytes: u64,
    /// Also cache values fetched from peers
    pub cache_peer_loads: bool,
    /// Object size range in bytes
    pub min_size: usize,
    /// Object size range in bytes
    pub max_size: usize,
    /// Simulated origin latency
    pub origin_latency: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: 3,
            cache_bytes: 1 << 20,
            cache_peer_loads: false,
            min_size: 128,
            max_size: 4096,
            origin_latency: Duration::ZERO,
        }
    }
}

/// Shared address book; nodes listed in `down` refuse connections.
#[derive(Default)]
struct Network {
    pools: RwLock<HashMap<String, Arc<PeerPool>>>,
    down: RwLock<HashSet<String>>,
}

/// Delivers peer requests to a node through the network.
struct Loopback {
    url: String,
    network: Arc<Network>,
}

impl PeerGetter for Loopback {
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        let down = self
            .network
            .down
            .read()
            .map_err(|_| Error::PeerRequest("network poisoned".to_string()))?
            .contains(&self.url);
        let pool = self
            .network
            .pools
            .read()
            .map_err(|_| Error::PeerRequest("network poisoned".to_string()))?
            .get(&self.url)
            .cloned();
        let pool = match pool {
            Some(pool) if !down => pool,
            _ => return Err(Error::PeerRequest(format!("connection refused: {}", self.url))),
        };

        let path = format!("{}{}/{}", pool.config().base_path, escape(group), escape(key));
        pool.handle(&path).into_result()
    }
}

/// One simulated node
pub struct Node {
    url: String,
    group: Arc<Group>,
    origin_calls: Arc<AtomicU64>,
    origin_bytes: Arc<AtomicU64>,
}

impl Node {
    /// The node's base URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The node's group
    pub fn group(&self) -> &Arc<Group> {
        &self.group
    }

    /// Number of origin loads performed by this node
    pub fn origin_calls(&self) -> u64 {
        self.origin_calls.load(Ordering::Relaxed)
    }

    fn report(&self, down: bool) -> NodeReport {
        let stats = self.group.stats();
        let load = peercache::GroupStats::load;
        NodeReport {
            node: self.url.clone(),
            down,
            gets: load(&stats.gets),
            cache_hits: load(&stats.cache_hits),
            loads_deduped: load(&stats.loads_deduped),
            load_cache_hits: load(&stats.load_cache_hits),
            peer_loads: load(&stats.peer_loads),
            peer_errors: load(&stats.peer_errors),
            local_loads: load(&stats.local_loads),
            server_requests: load(&stats.server_requests),
            origin_calls: self.origin_calls(),
            origin_bytes: self.origin_bytes.load(Ordering::Relaxed),
            cache_entries: self.group.main_cache().len() as u64,
            cache_bytes: self.group.main_cache().nbytes(),
        }
    }
}

/// A set of nodes wired to each other.
pub struct Cluster {
    network: Arc<Network>,
    nodes: Vec<Node>,
}

impl Cluster {
    /// Starts `config.nodes` nodes that all know each other.
    pub fn start(config: &ClusterConfig) -> Result<Self> {
        let network = Arc::new(Network::default());
        let urls: Vec<String> = (0..config.nodes.max(1))
            .map(|i| format!("http://node-{i}.sim:8001"))
            .collect();

        let mut nodes = Vec::with_capacity(urls.len());
        for url in &urls {
            let origin_calls = Arc::new(AtomicU64::new(0));
            let origin_bytes = Arc::new(AtomicU64::new(0));
            let registry = Arc::new(Registry::new());

            let getter = {
                let calls = Arc::clone(&origin_calls);
                let bytes = Arc::clone(&origin_bytes);
                let (min, max, latency) = (config.min_size, config.max_size, config.origin_latency);
                getter_fn(move |key| {
                    if !latency.is_zero() {
                        thread::sleep(latency);
                    }
                    let size = object_size(key, min, max);
                    calls.fetch_add(1, Ordering::Relaxed);
                    bytes.fetch_add(size as u64, Ordering::Relaxed);
                    Ok(vec![b'x'; size])
                })
            };
            let group = registry.new_group(
                GroupConfig {
                    cache_bytes: config.cache_bytes,
                    cache_peer_loads: config.cache_peer_loads,
                    ..GroupConfig::new(GROUP_NAME)
                },
                getter,
            )?;

            let net = Arc::clone(&network);
            let pool = Arc::new(PeerPool::with_connector(
                PeerPoolConfig::new(url.clone()),
                registry,
                move |peer| {
                    Arc::new(Loopback {
                        url: peer.to_string(),
                        network: Arc::clone(&net),
                    }) as Arc<dyn PeerGetter>
                },
            ));
            pool.set_peers(urls.iter().cloned());
            group.register_peers(pool.clone())?;

            network
                .pools
                .write()
                .map_err(|_| Error::PeerRequest("network poisoned".to_string()))?
                .insert(url.clone(), pool);
            nodes.push(Node {
                url: url.clone(),
                group,
                origin_calls,
                origin_bytes,
            });
        }

        info!(nodes = nodes.len(), "cluster started");
        Ok(Cluster { network, nodes })
    }

    /// The cluster's nodes
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Marks a node as unreachable for its peers. Clients talking to it
    /// directly are still served.
    pub fn set_down(&self, index: usize, down: bool) {
        let Some(node) = self.nodes.get(index) else {
            return;
        };
        if let Ok(mut set) = self.network.down.write() {
            if down {
                set.insert(node.url.clone());
            } else {
                set.remove(&node.url);
            }
        }
        info!(node = %node.url, down, "node availability changed");
    }

    /// Replays `requests` from `threads` client threads and collects a report.
    pub fn run(&self, requests: &[Request], threads: usize) -> RunReport {
        let threads = threads.max(1);
        let chunk = requests.len().div_ceil(threads).max(1);
        let errors = AtomicU64::new(0);
        let started = Instant::now();

        thread::scope(|scope| {
            for (t, slice) in requests.chunks(chunk).enumerate() {
                let errors = &errors;
                scope.spawn(move || {
                    for request in slice {
                        let node = &self.nodes[request.node % self.nodes.len()];
                        if let Err(err) = node.group.get(&request.key) {
                            debug!(thread = t, key = %request.key, error = %err, "request failed");
                            errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        let down = self.network.down.read().map(|set| set.clone()).unwrap_or_default();
        RunReport {
            requests: requests.len() as u64,
            unique_keys: requests
                .iter()
                .map(|request| request.key.as_str())
                .collect::<HashSet<_>>()
                .len() as u64,
            errors: errors.load(Ordering::Relaxed),
            duration: started.elapsed(),
            nodes: self
                .nodes
                .iter()
                .map(|node| node.report(down.contains(&node.url)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::{generate, WorkloadConfig};

    fn workload(requests: usize, nodes: usize) -> Vec<Request> {
        generate(
            &WorkloadConfig {
                requests,
                unique_objects: 300,
                ..Default::default()
            },
            nodes,
        )
    }

    #[test]
    fn test_large_caches_load_each_key_once() {
        let cluster = Cluster::start(&ClusterConfig {
            cache_bytes: 0,
            ..Default::default()
        })
        .unwrap();
        let requests = workload(3_000, 3);
        let report = cluster.run(&requests, 4);

        assert_eq!(report.errors, 0);
        assert_eq!(report.total_origin_calls(), report.unique_keys);
        assert_eq!(
            report.nodes.iter().map(|node| node.gets).sum::<u64>(),
            report.requests + report.nodes.iter().map(|n| n.server_requests).sum::<u64>()
        );
    }

    #[test]
    fn test_down_node_shifts_loads_to_origin() {
        let cluster = Cluster::start(&ClusterConfig::default()).unwrap();
        cluster.set_down(1, true);
        let requests = workload(2_000, 3);
        let report = cluster.run(&requests, 2);

        assert_eq!(report.errors, 0);
        assert!(report.nodes.iter().map(|node| node.peer_errors).sum::<u64>() > 0);
        assert!(report.nodes[1].down);
        assert_eq!(report.nodes[1].server_requests, 0);
    }
}
