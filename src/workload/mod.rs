//! Workload generation
//!
//! - `permutation`: seeded shuffle of the key range
//! - `zipf`: zipfian index sampler
//! - `key_selector`: conflict-percentage vs zipfian key models
//! - `generator`: per-client request plans

pub mod generator;
pub mod key_selector;
pub mod permutation;
pub mod zipf;

pub use generator::{PlannedRequest, WorkloadPlan};
pub use key_selector::{ConflictChooser, KeyModel, KeySampler, CONTENTION_INDEX};
pub use permutation::KeyPermutation;
pub use zipf::{ZipfSampler, ZipfTable};
