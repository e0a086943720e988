//! Benchmark execution
//!
//! - `simulated_client`: one closed-loop client per thread
//! - `coordinator`: merges the stats handed off by clients
//! - `orchestrator`: discovery, thread lifecycle, result collection

pub mod coordinator;
pub mod orchestrator;
pub mod simulated_client;

pub use coordinator::{MergedStats, StatsMerger};
pub use orchestrator::{BenchmarkResult, Orchestrator};
pub use simulated_client::{ClientPhase, ClientReport, RunContext, SimulatedClient};
