//! Fixed-resolution latency statistics
//!
//! Each simulated client owns one `Stats` per operation kind and records every
//! request outcome into it. Latencies land in a fixed array of
//! `HISTOGRAM_GRANULARITY_MS`-wide buckets sized from the latency ceiling, so
//! memory is bounded no matter how many requests are issued. Anything at or
//! above the ceiling is rerouted to the error accounting as
//! [`ELAPSED_TOO_LONG`]; it is never dropped unaccounted.
//!
//! Finished stats are moved to the coordinator and combined with [`Stats::merge`],
//! which is associative and commutative with the empty `Stats` as identity.

use std::collections::BTreeMap;
use std::time::Duration;

/// Width of one histogram bucket in milliseconds (must divide 1000)
pub const HISTOGRAM_GRANULARITY_MS: u64 = 5;

/// Default latency ceiling in seconds
pub const DEFAULT_MAX_LATENCY_SECS: u64 = 120;

/// Largest accepted latency ceiling in seconds (720k buckets, about 5.8 MB)
pub const MAX_LATENCY_LIMIT_SECS: u64 = 3600;

/// Failure reason used for requests at or above the latency ceiling
pub const ELAPSED_TOO_LONG: &str = "elapsed too long";

/// Outcome of one request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Reply received and acknowledged
    Success(Duration),
    /// Request failed; the text is the error reason
    Failure(String),
}

/// Latency/error accumulator for one metric kind
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    iterations: u64,
    successes: u64,
    errors: u64,
    /// Error reason -> occurrences (ordered for stable output)
    error_map: BTreeMap<String, u64>,
    /// Bucket `i` counts latencies in `[i*G, (i+1)*G)` ms
    buckets: Vec<u64>,
    min_latency: Option<Duration>,
    max_latency: Option<Duration>,
    max_secs: u64,
}

impl Stats {
    /// Create empty stats with a ceiling of `max_secs` seconds
    ///
    /// The ceiling is clamped to [`MAX_LATENCY_LIMIT_SECS`].
    pub fn new(max_secs: u64) -> Self {
        let max_secs = max_secs.min(MAX_LATENCY_LIMIT_SECS);
        let bucket_count = (max_secs * (1000 / HISTOGRAM_GRANULARITY_MS)) as usize;
        Self {
            iterations: 0,
            successes: 0,
            errors: 0,
            error_map: BTreeMap::new(),
            buckets: vec![0; bucket_count],
            min_latency: None,
            max_latency: None,
            max_secs,
        }
    }

    /// Record one request outcome
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success(latency) => self.record_latency(latency),
            Outcome::Failure(reason) => self.record_error(&reason),
        }
    }

    /// Record a successful request that took `latency`
    pub fn record_latency(&mut self, latency: Duration) {
        if latency >= self.ceiling() {
            self.record_error(ELAPSED_TOO_LONG);
            return;
        }

        self.iterations += 1;
        self.successes += 1;
        self.min_latency = Some(self.min_latency.map_or(latency, |m| m.min(latency)));
        self.max_latency = Some(self.max_latency.map_or(latency, |m| m.max(latency)));

        let idx = (latency.as_millis() as u64 / HISTOGRAM_GRANULARITY_MS) as usize;
        self.buckets[idx] += 1;
    }

    /// Record a failed request
    pub fn record_error(&mut self, reason: &str) {
        self.iterations += 1;
        self.add_error(reason, 1);
    }

    fn add_error(&mut self, reason: &str, count: u64) {
        self.errors += count;
        match self.error_map.get_mut(reason) {
            Some(c) => *c += count,
            None => {
                self.error_map.insert(reason.to_string(), count);
            }
        }
    }

    /// Latency below which `p` percent of the bucketed observations fall
    ///
    /// Returns the upper bound of the first bucket whose cumulative count
    /// strictly exceeds `p% * total`. Errors are not part of the total.
    /// Returns zero when no latency has been recorded.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.buckets.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let p = p.clamp(0.0, 100.0);
        // Clamp so p100 resolves to the highest populated bucket
        let cutoff = ((total as f64 * p / 100.0) as u64).min(total - 1);

        let mut count = 0u64;
        for (i, c) in self.buckets.iter().enumerate() {
            count += c;
            if count > cutoff {
                return Duration::from_millis((i as u64 + 1) * HISTOGRAM_GRANULARITY_MS);
            }
        }
        Duration::ZERO
    }

    /// Fold `other` into `self`
    ///
    /// Stats built with different ceilings merge into the larger shape.
    pub fn merge(&mut self, other: &Stats) {
        self.iterations += other.iterations;
        self.successes += other.successes;
        for (reason, count) in &other.error_map {
            self.add_error(reason, *count);
        }

        self.min_latency = match (self.min_latency, other.min_latency) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_latency = match (self.max_latency, other.max_latency) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        if other.buckets.len() > self.buckets.len() {
            self.buckets.resize(other.buckets.len(), 0);
            self.max_secs = other.max_secs;
        }
        for (mine, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            *mine += theirs;
        }
    }

    /// `val` as a percentage of iterations
    pub fn as_percent(&self, val: u64) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            val as f64 * 100.0 / self.iterations as f64
        }
    }

    /// Iterations per second over a wall-clock duration
    pub fn throughput(&self, duration: Duration) -> f64 {
        let secs = duration.as_secs_f64();
        if secs > 0.0 {
            self.iterations as f64 / secs
        } else {
            0.0
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn error_map(&self) -> &BTreeMap<String, u64> {
        &self.error_map
    }

    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Number of latencies held in the histogram
    pub fn recorded(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Smallest recorded latency (zero when nothing was recorded)
    pub fn min_latency(&self) -> Duration {
        self.min_latency.unwrap_or(Duration::ZERO)
    }

    /// Largest recorded latency (zero when nothing was recorded)
    pub fn max_latency(&self) -> Duration {
        self.max_latency.unwrap_or(Duration::ZERO)
    }

    pub fn max_secs(&self) -> u64 {
        self.max_secs
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }

    pub fn is_empty(&self) -> bool {
        self.iterations == 0
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LATENCY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn sample(latencies: &[u64], errors: &[&str]) -> Stats {
        let mut stats = Stats::new(2);
        for &l in latencies {
            stats.record(Outcome::Success(ms(l)));
        }
        for &e in errors {
            stats.record(Outcome::Failure(e.to_string()));
        }
        stats
    }

    #[test]
    fn test_bucket_count_from_ceiling() {
        assert_eq!(Stats::new(1).buckets().len(), 200);
        assert_eq!(Stats::default().buckets().len(), 24_000);
    }

    #[test]
    fn test_oversized_ceiling_is_clamped() {
        let stats = Stats::new(184_467_440_737_095_517);
        assert_eq!(stats.max_secs(), MAX_LATENCY_LIMIT_SECS);
        assert_eq!(stats.buckets().len(), 720_000);
    }

    #[test]
    fn test_record_success_and_failure() {
        let stats = sample(&[3, 7, 12], &["read failed: eof", "read failed: eof", "boom"]);

        assert_eq!(stats.iterations(), 6);
        assert_eq!(stats.successes(), 3);
        assert_eq!(stats.errors(), 3);
        assert_eq!(stats.error_map().get("read failed: eof"), Some(&2));
        assert_eq!(stats.error_map().get("boom"), Some(&1));
        assert_eq!(stats.min_latency(), ms(3));
        assert_eq!(stats.max_latency(), ms(12));
        assert_eq!(stats.buckets()[0], 1);
        assert_eq!(stats.buckets()[1], 1);
        assert_eq!(stats.buckets()[2], 1);
        assert_eq!(stats.successes() + stats.errors(), stats.iterations());
        assert_eq!(stats.recorded() + stats.errors(), stats.iterations());
    }

    #[test]
    fn test_latency_at_ceiling_is_error() {
        let mut stats = Stats::new(1);
        stats.record(Outcome::Success(Duration::from_secs(1)));
        stats.record(Outcome::Success(Duration::from_secs(5)));

        assert_eq!(stats.iterations(), 2);
        assert_eq!(stats.successes(), 0);
        assert_eq!(stats.errors(), 2);
        assert_eq!(stats.error_map().get(ELAPSED_TOO_LONG), Some(&2));
        assert_eq!(stats.recorded(), 0);
        assert_eq!(stats.min_latency(), Duration::ZERO);
        assert_eq!(stats.max_latency(), Duration::ZERO);
    }

    #[test]
    fn test_latency_just_below_ceiling_is_recorded() {
        let mut stats = Stats::new(1);
        stats.record(Outcome::Success(ms(999)));
        assert_eq!(stats.successes(), 1);
        assert_eq!(stats.buckets()[199], 1);
    }

    #[test]
    fn test_percentile_empty_is_zero() {
        let stats = Stats::new(1);
        assert_eq!(stats.percentile(50.0), Duration::ZERO);
        assert_eq!(stats.percentile(99.0), Duration::ZERO);

        // Errors alone do not populate buckets
        let stats = sample(&[], &["x"]);
        assert_eq!(stats.percentile(50.0), Duration::ZERO);
    }

    #[test]
    fn test_percentile_bucket_upper_bounds() {
        let mut stats = Stats::new(1);
        for _ in 0..90 {
            stats.record_latency(ms(1));
        }
        for _ in 0..10 {
            stats.record_latency(ms(42));
        }

        assert_eq!(stats.percentile(50.0), ms(5));
        // cutoff 89 -> first cumulative count > 89 is bucket 0 (90)
        assert_eq!(stats.percentile(89.0), ms(5));
        // cutoff 90 -> needs bucket 8
        assert_eq!(stats.percentile(90.0), ms(45));
        assert_eq!(stats.percentile(99.0), ms(45));
        assert_eq!(stats.percentile(100.0), ms(45));
    }

    #[test]
    fn test_percentile_monotonic() {
        let stats = sample(&[1, 2, 8, 16, 33, 70, 150, 400, 900, 1500], &["e"]);
        let p50 = stats.percentile(50.0);
        let p95 = stats.percentile(95.0);
        let p99 = stats.percentile(99.0);
        let p100 = stats.percentile(100.0);
        assert!(p50 <= p95);
        assert!(p95 <= p99);
        assert!(p99 <= p100);
        assert_eq!(p100, ms(1505));
    }

    #[test]
    fn test_merge_identity() {
        let s = sample(&[4, 9, 300], &["a", "b"]);

        let mut left = Stats::new(2);
        left.merge(&s);
        assert_eq!(left, s);

        let mut right = s.clone();
        right.merge(&Stats::new(2));
        assert_eq!(right, s);
    }

    #[test]
    fn test_merge_commutative_and_associative() {
        let a = sample(&[1, 2, 3], &["x"]);
        let b = sample(&[40, 50], &["x", "y"]);
        let c = sample(&[999, 7], &[]);

        let mut ab_c = a.clone();
        ab_c.merge(&b);
        ab_c.merge(&c);

        let mut bc = b.clone();
        bc.merge(&c);
        let mut a_bc = a.clone();
        a_bc.merge(&bc);

        let mut cba = c.clone();
        cba.merge(&b);
        cba.merge(&a);

        assert_eq!(ab_c, a_bc);
        assert_eq!(ab_c, cba);
        assert_eq!(ab_c.iterations(), 10);
        assert_eq!(ab_c.successes(), 7);
        assert_eq!(ab_c.errors(), 3);
        assert_eq!(ab_c.error_map().get("x"), Some(&2));
        assert_eq!(ab_c.min_latency(), ms(1));
        assert_eq!(ab_c.max_latency(), ms(999));
    }

    #[test]
    fn test_merge_different_ceilings() {
        let mut small = Stats::new(1);
        small.record_latency(ms(10));
        let mut large = Stats::new(3);
        large.record_latency(ms(2500));

        small.merge(&large);
        assert_eq!(small.buckets().len(), 600);
        assert_eq!(small.max_secs(), 3);
        assert_eq!(small.recorded(), 2);
    }

    #[test]
    fn test_throughput_and_percent() {
        let stats = sample(&[1, 1, 1], &["e"]);
        assert!((stats.throughput(Duration::from_secs(2)) - 2.0).abs() < f64::EPSILON);
        assert!((stats.as_percent(stats.successes()) - 75.0).abs() < f64::EPSILON);
        assert_eq!(Stats::new(1).as_percent(0), 0.0);
        assert_eq!(stats.throughput(Duration::ZERO), 0.0);
    }
}
