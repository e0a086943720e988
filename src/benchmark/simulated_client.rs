//! Simulated client driver
//!
//! A simulated client owns one connection per replica and issues its planned
//! requests strictly one after another. Its lifecycle is
//! `Init -> Running -> Done`:
//!
//! - Init: open connections, precompute the request plan
//! - Running: one request/reply exchange per planned request, each outcome
//!   recorded into the read or write stats
//! - Done: close connections, hand both stats objects to the coordinator
//!
//! Per-request failures are recorded and never leave the client.

use std::mem;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::client::{ConnectionFactory, ReplicaClient};
use crate::config::BenchConfig;
use crate::metrics::{Outcome, Stats};
use crate::protocol::{Operation, Propose};
use crate::utils::ProtocolError;
use crate::workload::{KeyModel, KeyPermutation, PlannedRequest, WorkloadPlan};

/// Client lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    Init,
    Running,
    Done,
}

/// Run-wide state shared read-only by every simulated client
#[derive(Debug)]
pub struct RunContext {
    pub config: Arc<BenchConfig>,
    pub replicas: Arc<Vec<String>>,
    /// Replica receiving requests when a leader is used
    pub leader: usize,
    pub permutation: Arc<KeyPermutation>,
    pub key_model: Arc<KeyModel>,
}

impl RunContext {
    /// Replica a planned request is sent to
    pub fn target(&self, request: &PlannedRequest) -> usize {
        if request.op == Operation::Read {
            if let Some(target) = self.config.read_from {
                return target;
            }
        }
        if self.config.no_leader {
            request.replica
        } else {
            self.leader
        }
    }
}

/// Per-client outcome summary, returned when the client thread finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReport {
    pub client_idx: usize,
    pub successes: u64,
    pub errors: u64,
    /// Replicas reachable at startup
    pub connected: usize,
}

/// One simulated client
pub struct SimulatedClient {
    idx: usize,
    ctx: Arc<RunContext>,
    phase: ClientPhase,
    reads: Stats,
    writes: Stats,
}

impl SimulatedClient {
    pub fn new(idx: usize, ctx: Arc<RunContext>) -> Self {
        let max_secs = ctx.config.max_latency_secs;
        Self {
            idx,
            ctx,
            phase: ClientPhase::Init,
            reads: Stats::new(max_secs),
            writes: Stats::new(max_secs),
        }
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    /// Run the whole lifecycle and hand off the stats
    ///
    /// Leaves the client in `Done` with empty stats. A send failure means the
    /// coordinator is gone; it is logged and the report is still returned.
    pub fn run(&mut self, reads_tx: &Sender<Stats>, writes_tx: &Sender<Stats>) -> ClientReport {
        if self.phase != ClientPhase::Init {
            warn!("Client {}: already ran", self.idx);
        }
        let config = Arc::clone(&self.ctx.config);

        let mut conns =
            ConnectionFactory::from_config(&config).connect_all(self.idx, &self.ctx.replicas);
        let plan = WorkloadPlan::generate(
            &config,
            &self.ctx.key_model,
            self.idx,
            self.ctx.replicas.len(),
        );
        debug!(
            "Client {}: {}/{} replicas connected, {} requests ({} writes), per replica {:?}",
            self.idx,
            conns.connected(),
            conns.len(),
            plan.len(),
            plan.writes(),
            plan.per_replica_counts(conns.len())
        );
        let connected = conns.connected();

        self.phase = ClientPhase::Running;
        for (position, request) in plan.requests().iter().enumerate() {
            self.issue(&mut conns, position, request);
            if let Some(pause) = config.sleep {
                thread::sleep(pause);
            }
        }

        conns.close();
        self.phase = ClientPhase::Done;

        let report = ClientReport {
            client_idx: self.idx,
            successes: self.reads.successes() + self.writes.successes(),
            errors: self.reads.errors() + self.writes.errors(),
            connected,
        };
        info!("Client {}: successful {}", self.idx, report.successes);

        let max_secs = config.max_latency_secs;
        let reads = mem::replace(&mut self.reads, Stats::new(max_secs));
        let writes = mem::replace(&mut self.writes, Stats::new(max_secs));
        if reads_tx.send(reads).is_err() {
            warn!("Client {}: coordinator gone, read stats dropped", self.idx);
        }
        if writes_tx.send(writes).is_err() {
            warn!("Client {}: coordinator gone, write stats dropped", self.idx);
        }
        report
    }

    fn issue(&mut self, conns: &mut ReplicaClient, position: usize, request: &PlannedRequest) {
        let propose = Propose {
            command_id: position as i32,
            op: request.op,
            key: self.ctx.permutation.key(request.key_index),
            value: if request.op.is_write() { position as i64 } else { 0 },
            timestamp: position as i64,
        };

        let outcome = match conns.exchange(self.ctx.target(request), &propose) {
            Ok(exchange) if exchange.reply.is_ok() => Outcome::Success(exchange.latency),
            Ok(_) => Outcome::Failure(ProtocolError::Rejected.to_string()),
            Err(e) => Outcome::Failure(e.to_string()),
        };

        let stats = match request.op {
            Operation::Read => &mut self.reads,
            Operation::Write => &mut self.writes,
        };
        stats.record(outcome);
    }
}
