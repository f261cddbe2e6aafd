// Statistics reporting for cluster simulation

use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Counters of one node after a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeReport {
    pub node: String,
    pub down: bool,
    pub gets: u64,
    pub cache_hits: u64,
    pub loads_deduped: u64,
    pub load_cache_hits: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub local_loads: u64,
    pub server_requests: u64,
    pub origin_calls: u64,
    pub origin_bytes: u64,
    pub cache_entries: u64,
    pub cache_bytes: u64,
}

impl NodeReport {
    /// Share of gets answered from the local cache
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.gets as f64 * 100.0
        }
    }
}

/// Outcome of replaying a workload against a cluster
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Client requests replayed
    pub requests: u64,
    /// Distinct keys among the requests
    pub unique_keys: u64,
    /// Client requests that returned an error
    pub errors: u64,
    /// Wall time of the run
    pub duration: Duration,
    /// Per-node counters, in node order
    pub nodes: Vec<NodeReport>,
}

impl RunReport {
    /// Origin loads summed over all nodes
    pub fn total_origin_calls(&self) -> u64 {
        self.nodes.iter().map(|node| node.origin_calls).sum()
    }

    /// Origin loads beyond the first one per key. Nonzero values come from
    /// evictions, outages and owners changing.
    pub fn redundant_origin_calls(&self) -> u64 {
        self.total_origin_calls().saturating_sub(self.unique_keys)
    }

    /// Client requests served per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.requests as f64 / secs
        }
    }

    pub fn print_summary(&self) {
        println!("\nCluster Simulation Summary");
        println!("==========================");
        println!("Client requests:   {}", self.requests);
        println!("Unique keys:       {}", self.unique_keys);
        println!("Errors:            {}", self.errors);
        println!(
            "Origin calls:      {} ({} redundant)",
            self.total_origin_calls(),
            self.redundant_origin_calls()
        );
        println!(
            "Duration:          {:.3}s ({:.0} req/s)",
            self.duration.as_secs_f64(),
            self.throughput()
        );

        println!("\nResults by Node:");
        println!(
            "{:<24} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>10}",
            "Node",
            "Gets",
            "HitRate",
            "Deduped",
            "PeerOK",
            "PeerErr",
            "Origin",
            "Served",
            "Entries",
            "Bytes"
        );
        println!("{}", "-".repeat(112));
        for node in &self.nodes {
            let name = if node.down {
                format!("{} (down)", node.node)
            } else {
                node.node.clone()
            };
            println!(
                "{:<24} {:>8} {:>7.2}% {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>10}",
                name,
                node.gets,
                node.hit_rate(),
                node.loads_deduped,
                node.peer_loads,
                node.peer_errors,
                node.origin_calls,
                node.server_requests,
                node.cache_entries,
                node.cache_bytes
            );
        }
    }

    /// Export per-node results to a CSV file
    pub fn export_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for node in &self.nodes {
            writer.serialize(node)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            requests: 10,
            unique_keys: 3,
            errors: 0,
            duration: Duration::from_millis(500),
            nodes: vec![
                NodeReport {
                    node: "a".to_string(),
                    gets: 8,
                    cache_hits: 6,
                    origin_calls: 2,
                    ..Default::default()
                },
                NodeReport {
                    node: "b".to_string(),
                    gets: 4,
                    cache_hits: 1,
                    origin_calls: 2,
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_totals() {
        let report = report();
        assert_eq!(report.total_origin_calls(), 4);
        assert_eq!(report.redundant_origin_calls(), 1);
        assert_eq!(report.throughput(), 20.0);
        assert_eq!(report.nodes[0].hit_rate(), 75.0);
        assert_eq!(NodeReport::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_export_csv() {
        let path = std::env::temp_dir().join(format!("cluster-sim-{}.csv", std::process::id()));
        report().export_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("node,down,gets,cache_hits"));
        assert!(lines.next().unwrap().starts_with("a,false,8,6"));
        assert_eq!(lines.count(), 1);
    }
}
