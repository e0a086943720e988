//! Per-client workload generation
//!
//! Each simulated client precomputes its whole request plan before opening
//! any connection: target replica, key index and operation for every request.
//! Generation is pure. All randomness comes from a stream seeded with the
//! client index, so the same configuration always yields the same plan for
//! the same client and different clients get independent plans.

use super::key_selector::KeyModel;
use crate::config::BenchConfig;
use crate::protocol::Operation;

/// One request of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedRequest {
    /// Replica index chosen for this request (used in leaderless mode)
    pub replica: usize,
    /// Index into the key permutation
    pub key_index: usize,
    pub op: Operation,
}

/// Precomputed request sequence of one simulated client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadPlan {
    requests: Vec<PlannedRequest>,
}

impl WorkloadPlan {
    /// Generate the plan of client `client_idx` for `replica_count` replicas
    pub fn generate(
        config: &BenchConfig,
        key_model: &KeyModel,
        client_idx: usize,
        replica_count: usize,
    ) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.client_seed(client_idx));
        // Separate stream for zipfian draws, derived from the client stream
        let mut keys = key_model.sampler(rng.u64(..));
        let targets = config.target_replica_count(replica_count).max(1);

        let requests = (0..config.requests as usize)
            .map(|position| {
                let replica = rng.usize(0..targets);
                let key_index = keys.next_index(position, &mut rng);
                let op = if rng.u32(0..100) < config.write_percent {
                    Operation::Write
                } else {
                    Operation::Read
                };
                PlannedRequest {
                    replica,
                    key_index,
                    op,
                }
            })
            .collect();

        Self { requests }
    }

    pub fn requests(&self) -> &[PlannedRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of planned writes
    pub fn writes(&self) -> usize {
        self.requests.iter().filter(|r| r.op.is_write()).count()
    }

    /// Requests planned per replica
    pub fn per_replica_counts(&self, replica_count: usize) -> Vec<usize> {
        let mut counts = vec![0; replica_count];
        for r in &self.requests {
            if let Some(c) = counts.get_mut(r.replica) {
                *c += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliArgs;
    use crate::workload::CONTENTION_INDEX;
    use clap::Parser;

    fn setup(args: &[&str]) -> (BenchConfig, KeyModel) {
        let mut argv = vec!["test"];
        argv.extend_from_slice(args);
        let config = BenchConfig::from_cli(&CliArgs::parse_from(argv)).unwrap();
        let model = KeyModel::new(config.key_selection, config.keyspace_len as usize).unwrap();
        (config, model)
    }

    #[test]
    fn test_plan_is_deterministic_per_client() {
        let (config, model) = setup(&["-q", "500", "-w", "50", "-s", "1.1"]);

        let a = WorkloadPlan::generate(&config, &model, 3, 3);
        let b = WorkloadPlan::generate(&config, &model, 3, 3);
        assert_eq!(a, b);

        let other = WorkloadPlan::generate(&config, &model, 4, 3);
        assert_ne!(a.requests(), other.requests());
    }

    #[test]
    fn test_full_conflict_writes_single_key() {
        let (config, model) = setup(&["-q", "5", "-D", "10", "-w", "100", "-c", "100"]);
        let plan = WorkloadPlan::generate(&config, &model, 0, 1);

        assert_eq!(plan.len(), 5);
        assert_eq!(plan.writes(), 5);
        assert!(plan.requests().iter().all(|r| r.key_index == CONTENTION_INDEX));
    }

    #[test]
    fn test_no_conflict_avoids_contention_key() {
        let (config, model) = setup(&["-q", "200", "-c", "0"]);
        let plan = WorkloadPlan::generate(&config, &model, 1, 3);
        assert!(plan.requests().iter().all(|r| r.key_index != CONTENTION_INDEX));
    }

    #[test]
    fn test_no_conflict_keys_pairwise_distinct() {
        let (config, model) = setup(&["-q", "50", "-c", "0"]);
        let plan = WorkloadPlan::generate(&config, &model, 0, 1);

        let mut indices: Vec<usize> = plan.requests().iter().map(|r| r.key_index).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 50);
        assert_eq!(indices, (1..=50).collect::<Vec<_>>());
    }

    #[test]
    fn test_write_percentage_extremes() {
        let (config, model) = setup(&["-q", "300", "-w", "0"]);
        assert_eq!(WorkloadPlan::generate(&config, &model, 0, 1).writes(), 0);

        let (config, model) = setup(&["-q", "300", "-w", "100"]);
        assert_eq!(WorkloadPlan::generate(&config, &model, 0, 1).writes(), 300);
    }

    #[test]
    fn test_bar_one_skips_last_replica() {
        let (config, model) = setup(&["-q", "1000", "--bar-one", "-e"]);
        let plan = WorkloadPlan::generate(&config, &model, 0, 3);
        let counts = plan.per_replica_counts(3);

        assert_eq!(counts[2], 0);
        assert!(counts[0] > 0 && counts[1] > 0);
    }

    #[test]
    fn test_replicas_spread_uniformly() {
        let (config, model) = setup(&["-q", "3000", "-e"]);
        let plan = WorkloadPlan::generate(&config, &model, 0, 3);
        for count in plan.per_replica_counts(3) {
            assert!((800..1200).contains(&count), "count = {}", count);
        }
    }

    #[test]
    fn test_key_indices_in_keyspace() {
        let (config, model) = setup(&["-q", "100", "-D", "40", "-s", "0.8"]);
        // -D below -q is raised to the request count
        assert_eq!(config.keyspace_len, 100);
        let plan = WorkloadPlan::generate(&config, &model, 2, 2);
        assert!(plan.requests().iter().all(|r| r.key_index < 100));
    }
}
