//! Stats aggregation coordinator
//!
//! Clients hand off finished read and write stats over two dedicated
//! channels. The coordinator merges them in arrival order until it has seen
//! the expected number of handoffs, then folds both kinds into a grand total.
//! The total therefore counts reads as well as writes.

use crossbeam_channel::{never, select, Receiver};
use tracing::debug;

use crate::metrics::Stats;
use crate::utils::{BenchError, Result};

/// Merged results of a run
#[derive(Debug, Clone, PartialEq)]
pub struct MergedStats {
    pub reads: Stats,
    pub writes: Stats,
    pub total: Stats,
}

/// Merges stats handoffs from all clients
pub struct StatsMerger {
    expected: u64,
    max_secs: u64,
}

impl StatsMerger {
    /// `expected` is the total number of handoffs across both channels
    pub fn new(expected: u64, max_secs: u64) -> Self {
        Self { expected, max_secs }
    }

    /// Block until every expected handoff arrived
    ///
    /// Fails if both channels disconnect first, which means some client
    /// exited without handing off its stats.
    pub fn run(self, reads_rx: Receiver<Stats>, writes_rx: Receiver<Stats>) -> Result<MergedStats> {
        let mut reads = Stats::new(self.max_secs);
        let mut writes = Stats::new(self.max_secs);
        let mut reads_rx = reads_rx;
        let mut writes_rx = writes_rx;
        let mut open = 2;
        let mut received = 0u64;

        while received < self.expected {
            if open == 0 {
                return Err(BenchError::Worker(format!(
                    "all clients disconnected after {} of {} stats handoffs",
                    received, self.expected
                )));
            }
            select! {
                recv(reads_rx) -> msg => match msg {
                    Ok(stats) => {
                        reads.merge(&stats);
                        received += 1;
                    }
                    Err(_) => {
                        reads_rx = never();
                        open -= 1;
                    }
                },
                recv(writes_rx) -> msg => match msg {
                    Ok(stats) => {
                        writes.merge(&stats);
                        received += 1;
                    }
                    Err(_) => {
                        writes_rx = never();
                        open -= 1;
                    }
                },
            }
        }
        debug!("Coordinator merged {} stats handoffs", received);

        let mut total = Stats::new(self.max_secs);
        total.merge(&reads);
        total.merge(&writes);
        Ok(MergedStats {
            reads,
            writes,
            total,
        })
    }
}
