// Cluster Simulator Library

pub mod cluster;
pub mod stats;
pub mod workload;
