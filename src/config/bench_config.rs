//! Benchmark configuration derived from CLI arguments
//!
//! `BenchConfig` is built once at startup and handed (behind an `Arc`) to the
//! workload generator, the simulated clients and the coordinator.

use super::cli::CliArgs;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Number of stats objects each simulated client hands off (reads + writes)
pub const KINDS_PER_CLIENT: u64 = 2;

/// Where the replica list and leader come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySource {
    /// Ask the master over the directory protocol
    Master { addr: String },
    /// Replicas given on the command line
    Static { replicas: Vec<String>, leader: usize },
}

/// Key selection model for a run (the two modes are exclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeySelection {
    /// Each request hits the contention key with probability `percent`%
    Conflict { percent: u32 },
    /// Keys drawn from a zipfian distribution over the key range
    Zipfian { s: f64, v: f64 },
}

impl fmt::Display for KeySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelection::Conflict { percent } => write!(f, "conflicts={}%", percent),
            KeySelection::Zipfian { s, v } => write!(f, "zipfian(s={}, v={})", s, v),
        }
    }
}

/// Complete benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    // Topology
    pub directory: DirectorySource,
    pub no_leader: bool,
    pub bar_one: bool,
    pub force_leader: Option<usize>,
    pub read_from: Option<usize>,

    // Workload
    pub clients: u32,
    pub requests: u64,
    pub write_percent: u32,
    pub key_selection: KeySelection,
    pub start_range: i64,
    pub keyspace_len: u64,
    pub sleep: Option<Duration>,
    pub seed: u64,

    // Timing
    pub max_latency_secs: u64,
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,

    // Output
    pub output_path: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}

impl BenchConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        args.validate()?;

        let directory = if args.replicas.is_empty() {
            DirectorySource::Master {
                addr: format!("{}:{}", args.master_addr, args.master_port),
            }
        } else {
            if args.leader_id >= args.replicas.len() {
                return Err(format!(
                    "--leader-id {} out of range for {} replicas",
                    args.leader_id,
                    args.replicas.len()
                ));
            }
            DirectorySource::Static {
                replicas: args.replicas.clone(),
                leader: args.leader_id,
            }
        };

        let key_selection = if args.conflicts >= 0 {
            KeySelection::Conflict {
                percent: args.conflicts as u32,
            }
        } else {
            KeySelection::Zipfian {
                s: args.zipf_s,
                v: args.zipf_v,
            }
        };

        let non_negative = |v: i32| usize::try_from(v).ok();

        Ok(Self {
            directory,
            no_leader: args.no_leader,
            bar_one: args.bar_one,
            force_leader: non_negative(args.force_leader),
            read_from: non_negative(args.read_from),

            clients: args.clients,
            requests: args.requests,
            write_percent: args.writes,
            key_selection,
            start_range: args.start_range,
            keyspace_len: args.effective_keyspace(),
            sleep: (args.sleep_ms > 0).then(|| Duration::from_millis(args.sleep_ms)),
            seed: args.seed,

            max_latency_secs: args.max_latency_secs,
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
            read_timeout: (args.read_timeout_ms > 0)
                .then(|| Duration::from_millis(args.read_timeout_ms)),

            output_path: args.output.clone(),
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }

    /// Check the replica overrides against the discovered topology
    pub fn validate_topology(&self, replica_count: usize) -> Result<(), String> {
        if replica_count == 0 {
            return Err("No replicas available".to_string());
        }
        if let Some(leader) = self.force_leader {
            if leader >= replica_count {
                return Err(format!(
                    "--force-leader {} out of range for {} replicas",
                    leader, replica_count
                ));
            }
        }
        if let Some(target) = self.read_from {
            if target >= replica_count {
                return Err(format!(
                    "--read-from {} out of range for {} replicas",
                    target, replica_count
                ));
            }
        }
        if self.bar_one && replica_count < 2 {
            return Err("--bar-one needs at least 2 replicas".to_string());
        }
        Ok(())
    }

    /// Whether the leader has to be looked up through the directory
    pub fn needs_leader_lookup(&self) -> bool {
        !self.no_leader && self.force_leader.is_none()
    }

    /// Number of replicas eligible as per-request targets
    pub fn target_replica_count(&self, replica_count: usize) -> usize {
        if self.bar_one {
            replica_count.saturating_sub(1).max(1)
        } else {
            replica_count
        }
    }

    /// Seed of the shared key permutation
    ///
    /// Offsets the run seed by the replica overrides (-1 when unset), so two
    /// runs that redirect to different replicas use different key orders.
    pub fn permutation_seed(&self) -> u64 {
        let offset = |v: Option<usize>| v.map(|x| x as i64).unwrap_or(-1);
        self.seed
            .wrapping_add_signed(offset(self.force_leader))
            .wrapping_add_signed(offset(self.read_from))
    }

    /// Seed of a simulated client's private random streams
    pub fn client_seed(&self, client_idx: usize) -> u64 {
        self.seed.wrapping_add(client_idx as u64)
    }

    /// Stats handoffs the coordinator has to receive before finishing
    pub fn expected_handoffs(&self) -> u64 {
        self.clients as u64 * KINDS_PER_CLIENT
    }
}
