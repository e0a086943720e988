//! Latency statistics and result reporting

pub mod reporter;
pub mod stats;

pub use reporter::{ErrorSummary, KindSummary, LatencySummary, RunSummary};
pub use stats::{
    Outcome, Stats, DEFAULT_MAX_LATENCY_SECS, ELAPSED_TOO_LONG, HISTOGRAM_GRANULARITY_MS,
    MAX_LATENCY_LIMIT_SECS,
};
