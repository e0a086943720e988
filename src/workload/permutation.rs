//! Seeded permutation of the key range
//!
//! The key range `[start, start + len)` is shuffled once per run. Samplers
//! produce indices into this permutation, so a skewed sampler's hot indices
//! map to keys scattered over the range rather than to its first keys.

/// Shuffled key range, shared read-only by all simulated clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPermutation {
    keys: Vec<i64>,
}

impl KeyPermutation {
    /// Shuffle `[start, start + len)` with a Fisher-Yates pass seeded by `seed`
    pub fn new(start: i64, len: u64, seed: u64) -> Self {
        let mut keys: Vec<i64> = (0..len as i64).map(|i| start + i).collect();
        let mut rng = fastrand::Rng::with_seed(seed);
        rng.shuffle(&mut keys);
        Self { keys }
    }

    /// Key at position `idx` (wraps around the range)
    #[inline]
    pub fn key(&self, idx: usize) -> i64 {
        self.keys[idx % self.keys.len()]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.keys
    }
}
