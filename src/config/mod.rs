//! Configuration module

pub mod bench_config;
pub mod cli;

pub use bench_config::{BenchConfig, DirectorySource, KeySelection, KINDS_PER_CLIENT};
pub use cli::CliArgs;
