use clap::Parser;
use cluster_simulator::cluster::{Cluster, ClusterConfig};
use cluster_simulator::workload::{self, WorkloadConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Peer cache cluster simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of nodes in the cluster
    #[arg(short, long, default_value = "3")]
    nodes: usize,

    /// Number of client requests to replay
    #[arg(short, long, default_value = "20000")]
    requests: usize,

    /// Number of client threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Number of unique objects
    #[arg(long, default_value = "5000")]
    objects: u32,

    /// Percentage of traffic from popular objects (default: 80%)
    #[arg(long, default_value = "80")]
    popular_traffic: u8,

    /// Percentage of objects that are popular (default: 20%)
    #[arg(long, default_value = "20")]
    popular_objects: u8,

    /// Minimum object size in bytes
    #[arg(long, default_value = "128")]
    min_size: usize,

    /// Maximum object size in bytes
    #[arg(long, default_value = "4096")]
    max_size: usize,

    /// Cache budget per node in bytes (0 disables eviction)
    #[arg(long, default_value = "1048576")]
    cache_bytes: u64,

    /// Also cache values fetched from peers
    #[arg(long)]
    cache_peer_loads: bool,

    /// Simulated origin latency in milliseconds
    #[arg(long, default_value = "0")]
    origin_latency_ms: u64,

    /// Index of a node that peers cannot reach during the run
    #[arg(long, value_name = "INDEX")]
    fail_node: Option<usize>,

    /// Random seed of the workload
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Export per-node results to CSV file
    #[arg(long, value_name = "PATH")]
    output_csv: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let cluster = Cluster::start(&ClusterConfig {
        nodes: args.nodes,
        cache_bytes: args.cache_bytes,
        cache_peer_loads: args.cache_peer_loads,
        min_size: args.min_size,
        max_size: args.max_size,
        origin_latency: Duration::from_millis(args.origin_latency_ms),
    })?;
    if let Some(index) = args.fail_node {
        cluster.set_down(index, true);
    }

    let requests = workload::generate(
        &WorkloadConfig {
            requests: args.requests,
            unique_objects: args.objects,
            popular_traffic_percent: args.popular_traffic,
            popular_objects_percent: args.popular_objects,
            seed: args.seed,
        },
        cluster.nodes().len(),
    );
    info!(requests = requests.len(), threads = args.threads, "replaying workload");

    let report = cluster.run(&requests, args.threads);
    report.print_summary();

    if let Some(path) = args.output_csv {
        report.export_csv(&path)?;
        println!("\nResults exported to {}", path.display());
    }

    Ok(())
}
