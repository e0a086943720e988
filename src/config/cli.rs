//! Command-line argument parsing
//!
//! Flag names follow the classic replicated-KV client (`-w`, `-q`, `-c`, `-T`,
//! `-D`, ...) so existing experiment scripts keep working.

use clap::Parser;
use std::path::PathBuf;

use crate::metrics::MAX_LATENCY_LIMIT_SECS;

/// Load generator for replicated key-value clusters
#[derive(Parser, Debug, Clone)]
#[command(name = "smr-bench")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Directory =====
    /// Master (directory) host
    #[arg(long = "maddr", default_value = "localhost")]
    pub master_addr: String,

    /// Master (directory) port
    #[arg(long = "mport", default_value_t = 7087)]
    pub master_port: u16,

    /// Replica address (repeatable); bypasses the master when given
    #[arg(long = "replica", action = clap::ArgAction::Append)]
    pub replicas: Vec<String>,

    /// Leader index among --replica addresses
    #[arg(long = "leader-id", default_value_t = 0)]
    pub leader_id: usize,

    // ===== Workload =====
    /// Percentage of updates (writes)
    #[arg(short = 'w', long = "writes", default_value_t = 100)]
    pub writes: u32,

    /// Number of requests issued by each simulated client
    #[arg(short = 'q', long = "requests", default_value_t = 5000)]
    pub requests: u64,

    /// Egalitarian mode: no leader, requests spread over replicas
    #[arg(short = 'e', long = "no-leader")]
    pub no_leader: bool,

    /// Percentage of conflicting requests (-1 selects the zipfian key model)
    #[arg(short = 'c', long = "conflicts", default_value_t = -1, allow_negative_numbers = true)]
    pub conflicts: i32,

    /// Zipfian exponent
    #[arg(short = 's', long = "zipf-s", default_value_t = 2.0)]
    pub zipf_s: f64,

    /// Zipfian offset
    #[arg(long = "zipf-v", default_value_t = 1.0)]
    pub zipf_v: f64,

    /// Send commands to all replicas except the last one
    #[arg(long = "bar-one")]
    pub bar_one: bool,

    /// Force all requests to a given replica (-1 = use discovered leader)
    #[arg(short = 'l', long = "force-leader", default_value_t = -1, allow_negative_numbers = true)]
    pub force_leader: i32,

    /// Send reads to this replica instead of the leader (-1 = disabled)
    #[arg(long = "read-from", default_value_t = -1, allow_negative_numbers = true)]
    pub read_from: i32,

    /// First key of the key range
    #[arg(long = "sr", default_value_t = 0, allow_negative_numbers = true)]
    pub start_range: i64,

    /// Key range size (-1 or anything below --requests uses --requests)
    #[arg(short = 'D', long = "keys", default_value_t = -1, allow_negative_numbers = true)]
    pub keys: i64,

    /// Pause between requests of a client, in milliseconds (0 = none)
    #[arg(long = "sleep", default_value_t = 0)]
    pub sleep_ms: u64,

    /// Number of simulated clients
    #[arg(short = 'T', long = "clients", default_value_t = 1)]
    pub clients: u32,

    /// Seed for workload generation
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    // ===== Timing =====
    /// Latency ceiling in seconds; slower requests count as errors
    #[arg(long = "max-latency", default_value_t = 120)]
    pub max_latency_secs: u64,

    /// Connection timeout in milliseconds
    #[arg(long = "connect-timeout", default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Socket read timeout in milliseconds (0 = block forever)
    #[arg(long = "read-timeout", default_value_t = 0)]
    pub read_timeout_ms: u64,

    // ===== Output =====
    /// Write the summary as JSON to this path
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(long = "quiet")]
    pub quiet: bool,

    /// Verbose output
    #[arg(long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument ranges and combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.writes > 100 {
            return Err("--writes must be between 0 and 100".to_string());
        }

        if self.conflicts > 100 || self.conflicts < -1 {
            return Err("Conflicts percentage must be between 0 and 100 (or -1)".to_string());
        }

        if self.clients == 0 {
            return Err("--clients must be at least 1".to_string());
        }

        if self.requests == 0 {
            return Err("--requests must be at least 1".to_string());
        }

        // Command ids are i32 on the wire
        if self.requests > i32::MAX as u64 {
            return Err(format!("--requests must not exceed {}", i32::MAX));
        }

        if self.max_latency_secs == 0 || self.max_latency_secs > MAX_LATENCY_LIMIT_SECS {
            return Err(format!(
                "--max-latency must be between 1 and {} seconds",
                MAX_LATENCY_LIMIT_SECS
            ));
        }

        if !self.zipf_s.is_finite() || self.zipf_s < 0.0 {
            return Err("--zipf-s must be a finite value >= 0".to_string());
        }

        if !self.zipf_v.is_finite() || self.zipf_v < 1.0 {
            return Err("--zipf-v must be a finite value >= 1".to_string());
        }

        if self.force_leader < -1 || self.read_from < -1 {
            return Err("--force-leader and --read-from take a replica index or -1".to_string());
        }

        if self.replicas.is_empty() && self.leader_id != 0 {
            return Err("--leader-id requires --replica".to_string());
        }

        if self.start_range.checked_add(self.effective_keyspace() as i64).is_none() {
            return Err("--sr plus key range overflows the key type".to_string());
        }

        Ok(())
    }

    /// Effective key range size
    ///
    /// Never smaller than the request count. In conflict mode the contention
    /// key takes one extra slot so every request position keeps its own key.
    pub fn effective_keyspace(&self) -> u64 {
        let floor = if self.conflicts >= 0 {
            self.requests + 1
        } else {
            self.requests
        };
        if self.keys < floor as i64 {
            floor
        } else {
            self.keys as u64
        }
    }
}
