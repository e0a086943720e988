//! Key index selection models
//!
//! A run either controls contention directly (conflict percentage) or draws
//! keys from a zipfian law; never both. `KeyModel` is the run-wide part
//! (built once), `KeySampler` the per-client part holding its own RNG state.

use std::sync::Arc;

use super::zipf::{ZipfSampler, ZipfTable};
use crate::config::KeySelection;

/// Permutation index of the shared contention key
pub const CONTENTION_INDEX: usize = 0;

/// Chooses between the contention key and a per-position unique key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictChooser {
    percent: u32,
    keyspace_len: usize,
}

impl ConflictChooser {
    pub fn new(percent: u32, keyspace_len: usize) -> Self {
        Self {
            percent: percent.min(100),
            keyspace_len,
        }
    }

    /// Key index for the request at `position`
    pub fn choose(&self, position: usize, rng: &mut fastrand::Rng) -> usize {
        if rng.u32(0..100) < self.percent {
            CONTENTION_INDEX
        } else {
            self.unique_index(position)
        }
    }

    /// Non-contention index derived from the request position
    ///
    /// Skips the contention index; with a single key there is nothing else.
    pub fn unique_index(&self, position: usize) -> usize {
        if self.keyspace_len <= 1 {
            CONTENTION_INDEX
        } else {
            1 + position % (self.keyspace_len - 1)
        }
    }

    pub fn percent(&self) -> u32 {
        self.percent
    }
}

/// Run-wide key model
#[derive(Debug, Clone)]
pub enum KeyModel {
    Conflict(ConflictChooser),
    Zipfian(Arc<ZipfTable>),
}

impl KeyModel {
    /// Build the model for a key range of `keyspace_len` keys
    pub fn new(selection: KeySelection, keyspace_len: usize) -> Result<Self, String> {
        match selection {
            KeySelection::Conflict { percent } => {
                if percent > 100 {
                    return Err(format!("conflict percentage {} above 100", percent));
                }
                Ok(KeyModel::Conflict(ConflictChooser::new(percent, keyspace_len)))
            }
            KeySelection::Zipfian { s, v } => {
                Ok(KeyModel::Zipfian(Arc::new(ZipfTable::new(keyspace_len, s, v)?)))
            }
        }
    }

    /// Per-client sampler
    pub fn sampler(&self, seed: u64) -> KeySampler {
        match self {
            KeyModel::Conflict(chooser) => KeySampler::Conflict(*chooser),
            KeyModel::Zipfian(table) => KeySampler::Zipfian(ZipfSampler::new(Arc::clone(table), seed)),
        }
    }
}

/// Per-client key sampler
#[derive(Debug, Clone)]
pub enum KeySampler {
    Conflict(ConflictChooser),
    Zipfian(ZipfSampler),
}

impl KeySampler {
    /// Key index for the request at `position`
    ///
    /// The conflict chooser draws from the caller's `rng`; the zipfian sampler
    /// uses its own stream.
    pub fn next_index(&mut self, position: usize, rng: &mut fastrand::Rng) -> usize {
        match self {
            KeySampler::Conflict(chooser) => chooser.choose(position, rng),
            KeySampler::Zipfian(zipf) => zipf.next_index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_conflict_always_contention() {
        let chooser = ConflictChooser::new(100, 10);
        let mut rng = fastrand::Rng::with_seed(1);
        assert!((0..1000).all(|i| chooser.choose(i, &mut rng) == CONTENTION_INDEX));
    }

    #[test]
    fn test_no_conflict_never_contention() {
        let chooser = ConflictChooser::new(0, 10);
        let mut rng = fastrand::Rng::with_seed(1);
        assert!((0..1000).all(|i| chooser.choose(i, &mut rng) != CONTENTION_INDEX));
    }

    #[test]
    fn test_unique_index_follows_position() {
        let chooser = ConflictChooser::new(0, 5);
        assert_eq!(chooser.unique_index(0), 1);
        assert_eq!(chooser.unique_index(3), 4);
        assert_eq!(chooser.unique_index(4), 1);
        assert_eq!(ConflictChooser::new(0, 1).unique_index(9), CONTENTION_INDEX);
    }

    #[test]
    fn test_partial_conflict_rate() {
        let chooser = ConflictChooser::new(30, 10_000);
        let mut rng = fastrand::Rng::with_seed(5);
        let hits = (0..10_000)
            .filter(|&i| chooser.choose(i, &mut rng) == CONTENTION_INDEX)
            .count();
        assert!((2500..3500).contains(&hits), "hits = {}", hits);
    }

    #[test]
    fn test_model_from_selection() {
        let model = KeyModel::new(KeySelection::Zipfian { s: 1.0, v: 1.0 }, 50).unwrap();
        assert!(matches!(model, KeyModel::Zipfian(ref t) if t.len() == 50));

        let model = KeyModel::new(KeySelection::Conflict { percent: 10 }, 50).unwrap();
        assert!(matches!(model, KeyModel::Conflict(c) if c.percent() == 10));

        assert!(KeyModel::new(KeySelection::Conflict { percent: 101 }, 50).is_err());
    }

    #[test]
    fn test_zipf_sampler_in_range() {
        let model = KeyModel::new(KeySelection::Zipfian { s: 0.5, v: 1.0 }, 20).unwrap();
        let mut sampler = model.sampler(3);
        let mut rng = fastrand::Rng::with_seed(0);
        assert!((0..1000).all(|i| sampler.next_index(i, &mut rng) < 20));
    }
}
