//! smr-bench library
//!
//! Closed-loop benchmark client for leader-based and leaderless
//! state-machine-replication clusters.

pub mod benchmark;
pub mod client;
pub mod config;
pub mod metrics;
pub mod protocol;
pub mod utils;
pub mod workload;
