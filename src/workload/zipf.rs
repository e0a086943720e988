//! Zipfian key sampler
//!
//! Samples indices `k` in `[0, n)` with probability proportional to
//! `(v + k)^-s`. With `s = 0` every index is equally likely; larger `s`
//! concentrates mass on the lowest indices, `v` flattens the head.
//!
//! The cumulative distribution is computed once per run (`ZipfTable`) and
//! shared; each client draws from it with its own seeded `ZipfSampler`.

use std::sync::Arc;

/// Cumulative distribution of a zipfian law over `n` indices
#[derive(Debug)]
pub struct ZipfTable {
    cdf: Vec<f64>,
}

impl ZipfTable {
    pub fn new(n: usize, s: f64, v: f64) -> Result<Self, String> {
        if n == 0 {
            return Err("zipfian support must not be empty".to_string());
        }
        if !s.is_finite() || s < 0.0 {
            return Err(format!("zipfian s must be >= 0, got {}", s));
        }
        if !v.is_finite() || v < 1.0 {
            return Err(format!("zipfian v must be >= 1, got {}", v));
        }

        let mut cdf = Vec::with_capacity(n);
        let mut acc = 0.0f64;
        for k in 0..n {
            acc += (v + k as f64).powf(-s);
            cdf.push(acc);
        }
        for c in cdf.iter_mut() {
            *c /= acc;
        }

        Ok(Self { cdf })
    }

    /// Support size
    pub fn len(&self) -> usize {
        self.cdf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cdf.is_empty()
    }

    /// Probability of index `k`
    pub fn probability(&self, k: usize) -> f64 {
        match k {
            0 => self.cdf[0],
            k if k < self.cdf.len() => self.cdf[k] - self.cdf[k - 1],
            _ => 0.0,
        }
    }

    /// Index for a uniform draw `u` in `[0, 1)`
    #[inline]
    fn index_for(&self, u: f64) -> usize {
        self.cdf.partition_point(|&c| c <= u).min(self.cdf.len() - 1)
    }
}

/// Seeded, restartable, endless stream of zipfian indices
#[derive(Debug, Clone)]
pub struct ZipfSampler {
    table: Arc<ZipfTable>,
    seed: u64,
    rng: fastrand::Rng,
}

impl ZipfSampler {
    pub fn new(table: Arc<ZipfTable>, seed: u64) -> Self {
        Self {
            table,
            seed,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Draw the next index
    #[inline]
    pub fn next_index(&mut self) -> usize {
        let u = self.rng.f64();
        self.table.index_for(u)
    }

    /// Rewind to the beginning of the sequence
    pub fn restart(&mut self) {
        self.rng = fastrand::Rng::with_seed(self.seed);
    }
}

impl Iterator for ZipfSampler {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        Some(self.next_index())
    }
}
