//! Benchmark orchestrator
//!
//! Discovers the topology, resolves the leader, then runs one thread per
//! simulated client plus the stats coordinator and collects the results.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use tracing::{debug, info};

use super::coordinator::{MergedStats, StatsMerger};
use super::simulated_client::{ClientReport, RunContext, SimulatedClient};
use crate::client::{Directory, MasterDirectory, StaticDirectory};
use crate::config::{BenchConfig, DirectorySource};
use crate::metrics::{RunSummary, Stats};
use crate::utils::{BenchError, DiscoveryError, Result};
use crate::workload::{KeyModel, KeyPermutation};

/// Results of a finished run
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub duration: Duration,
    pub reads: Stats,
    pub writes: Stats,
    pub total: Stats,
    pub clients: Vec<ClientReport>,
}

impl BenchmarkResult {
    /// Build the printable and serializable summary
    pub fn summary(&self, concurrency: u32) -> RunSummary {
        RunSummary::new(
            concurrency,
            self.duration,
            &self.total,
            &self.reads,
            &self.writes,
        )
    }
}

/// Runs a benchmark against a discovered cluster
pub struct Orchestrator {
    config: Arc<BenchConfig>,
    replicas: Arc<Vec<String>>,
    leader: usize,
}

impl Orchestrator {
    /// Discover the topology through the directory configured on the command line
    pub fn from_config(config: BenchConfig) -> Result<Self> {
        let mut directory: Box<dyn Directory> = match &config.directory {
            DirectorySource::Master { addr } => {
                info!("Querying master at {}", addr);
                Box::new(MasterDirectory::connect(addr, config.connect_timeout)?)
            }
            DirectorySource::Static { replicas, leader } => {
                Box::new(StaticDirectory::new(replicas.clone(), *leader))
            }
        };
        Self::new(config, directory.as_mut())
    }

    /// Discover the topology through `directory`
    ///
    /// Discovery failures and replica overrides outside the discovered list
    /// are fatal.
    pub fn new(config: BenchConfig, directory: &mut dyn Directory) -> Result<Self> {
        let replicas = directory.replica_list()?;
        config
            .validate_topology(replicas.len())
            .map_err(BenchError::Config)?;

        let leader = match config.force_leader {
            Some(forced) => forced,
            None if config.needs_leader_lookup() => {
                let leader = directory.leader()?;
                if leader >= replicas.len() {
                    return Err(DiscoveryError::LeaderOutOfRange {
                        leader: leader as i64,
                        replicas: replicas.len(),
                    }
                    .into());
                }
                leader
            }
            None => 0,
        };
        if config.needs_leader_lookup() || config.force_leader.is_some() {
            info!("Leader: replica {} ({})", leader, replicas[leader]);
        }

        Ok(Self {
            config: Arc::new(config),
            replicas: Arc::new(replicas),
            leader,
        })
    }

    pub fn replicas(&self) -> &[String] {
        &self.replicas
    }

    pub fn leader(&self) -> usize {
        self.leader
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run every simulated client to completion and merge their stats
    pub fn run(&self) -> Result<BenchmarkResult> {
        let config = &self.config;
        let key_model = KeyModel::new(config.key_selection, config.keyspace_len as usize)
            .map_err(BenchError::Config)?;
        let ctx = Arc::new(RunContext {
            config: Arc::clone(config),
            replicas: Arc::clone(&self.replicas),
            leader: self.leader,
            permutation: Arc::new(KeyPermutation::new(
                config.start_range,
                config.keyspace_len,
                config.permutation_seed(),
            )),
            key_model: Arc::new(key_model),
        });
        info!(
            "Starting {} clients x {} requests, {}% writes, {}, {} keys from {}",
            config.clients,
            config.requests,
            config.write_percent,
            config.key_selection,
            config.keyspace_len,
            config.start_range
        );

        let (reads_tx, reads_rx) = unbounded::<Stats>();
        let (writes_tx, writes_rx) = unbounded::<Stats>();

        let merger = StatsMerger::new(config.expected_handoffs(), config.max_latency_secs);
        let coordinator: JoinHandle<Result<MergedStats>> = thread::Builder::new()
            .name("stats-coordinator".to_string())
            .spawn(move || merger.run(reads_rx, writes_rx))?;

        let start_time = Instant::now();

        let mut handles: Vec<JoinHandle<ClientReport>> =
            Vec::with_capacity(config.clients as usize);
        for idx in 0..config.clients as usize {
            let ctx = Arc::clone(&ctx);
            let reads_tx = reads_tx.clone();
            let writes_tx = writes_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("sim-client-{}", idx))
                .spawn(move || {
                    let mut client = SimulatedClient::new(idx, ctx);
                    client.run(&reads_tx, &writes_tx)
                })?;
            handles.push(handle);
        }
        // Only client threads hold senders now
        drop((reads_tx, writes_tx));

        let mut clients = Vec::with_capacity(handles.len());
        for (idx, handle) in handles.into_iter().enumerate() {
            let report = handle
                .join()
                .map_err(|_| BenchError::Worker(format!("client {} panicked", idx)))?;
            clients.push(report);
        }

        let merged = coordinator
            .join()
            .map_err(|_| BenchError::Worker("stats coordinator panicked".to_string()))??;
        let duration = start_time.elapsed();
        debug!("Run finished in {:?}", duration);

        Ok(BenchmarkResult {
            duration,
            reads: merged.reads,
            writes: merged.writes,
            total: merged.total,
            clients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockBehavior, MockMaster, MockReplica};
    use crate::config::CliArgs;
    use crate::protocol::Operation;
    use crate::utils::ProtocolError;
    use clap::Parser;
    use std::collections::HashSet;

    fn config(args: &[&str]) -> BenchConfig {
        let mut argv = vec!["test"];
        argv.extend_from_slice(args);
        BenchConfig::from_cli(&CliArgs::parse_from(argv)).unwrap()
    }

    #[test]
    fn test_full_conflict_writes_one_key() {
        let replica = MockReplica::spawn(MockBehavior::Accept).unwrap();
        let addr = replica.addr();
        let cfg = config(&[
            "--replica", &addr, "-D", "10", "-T", "1", "-q", "5", "-w", "100", "-c", "100",
        ]);

        let result = Orchestrator::from_config(cfg).unwrap().run().unwrap();
        assert_eq!(result.total.successes(), 5);
        assert_eq!(result.total.errors(), 0);
        assert_eq!(result.writes.iterations(), 5);
        assert_eq!(result.clients.len(), 1);

        let received = replica.received();
        assert_eq!(received.len(), 5);
        assert!(received.iter().all(|p| p.op == Operation::Write));
        let keys: HashSet<i64> = received.iter().map(|p| p.key).collect();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_all_rejected_single_reason() {
        let replica = MockReplica::spawn(MockBehavior::Reject).unwrap();
        let addr = replica.addr();
        let cfg = config(&["--replica", &addr, "-T", "3", "-q", "7"]);

        let result = Orchestrator::from_config(cfg).unwrap().run().unwrap();
        assert_eq!(result.total.iterations(), 21);
        assert_eq!(result.total.errors(), 21);
        assert_eq!(result.total.error_map().len(), 1);
        assert_eq!(
            result.total.error_map().get(&ProtocolError::Rejected.to_string()),
            Some(&21)
        );
    }

    #[test]
    fn test_discovery_through_master() {
        let replicas: Vec<MockReplica> = (0..3)
            .map(|_| MockReplica::spawn(MockBehavior::Accept).unwrap())
            .collect();
        let addrs: Vec<String> = replicas.iter().map(MockReplica::addr).collect();
        let master = MockMaster::spawn(addrs.clone(), 2).unwrap();
        let master_addr = master.addr();
        let (host, port) = master_addr.rsplit_once(':').unwrap();

        let cfg = config(&["--maddr", host, "--mport", port, "-T", "2", "-q", "10"]);
        let orchestrator = Orchestrator::from_config(cfg).unwrap();
        assert_eq!(orchestrator.replicas(), addrs.as_slice());
        assert_eq!(orchestrator.leader(), 2);

        let result = orchestrator.run().unwrap();
        assert_eq!(result.total.successes(), 20);
        assert_eq!(replicas[2].received().len(), 20);
        assert!(replicas[0].received().is_empty());
    }

    #[test]
    fn test_leaderless_spreads_requests() {
        let replicas: Vec<MockReplica> = (0..3)
            .map(|_| MockReplica::spawn(MockBehavior::Accept).unwrap())
            .collect();
        let addrs: Vec<String> = replicas.iter().map(MockReplica::addr).collect();
        let mut args = vec!["-e", "-q", "300", "--bar-one"];
        for addr in &addrs {
            args.push("--replica");
            args.push(addr);
        }

        let result = Orchestrator::from_config(config(&args)).unwrap().run().unwrap();
        assert_eq!(result.total.successes(), 300);
        assert!(!replicas[0].received().is_empty());
        assert!(!replicas[1].received().is_empty());
        assert!(replicas[2].received().is_empty());
    }

    #[test]
    fn test_unreachable_master_is_fatal() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let port = addr.port().to_string();
        let cfg = config(&["--maddr", "127.0.0.1", "--mport", &port, "--connect-timeout", "200"]);

        let err = Orchestrator::from_config(cfg).err().unwrap();
        assert!(matches!(err, BenchError::Discovery(DiscoveryError::Unreachable { .. })));
    }

    #[test]
    fn test_leader_out_of_range_is_fatal() {
        let mut directory = StaticDirectory::new(vec!["a:1".into(), "b:2".into()], 5);
        let err = Orchestrator::new(config(&[]), &mut directory).err().unwrap();
        assert!(matches!(
            err,
            BenchError::Discovery(DiscoveryError::LeaderOutOfRange { leader: 5, replicas: 2 })
        ));
    }

    #[test]
    fn test_forced_leader_skips_lookup() {
        let mut directory = StaticDirectory::new(vec!["a:1".into(), "b:2".into()], 7);
        let orchestrator = Orchestrator::new(config(&["-l", "1"]), &mut directory).unwrap();
        assert_eq!(orchestrator.leader(), 1);

        let mut directory = StaticDirectory::new(vec!["a:1".into()], 0);
        assert!(matches!(
            Orchestrator::new(config(&["-l", "3"]), &mut directory),
            Err(BenchError::Config(_))
        ));
    }
}
