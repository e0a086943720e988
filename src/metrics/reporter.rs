//! Result rendering and export
//!
//! Builds the summary and error-detail tables printed after a run, and the
//! equivalent JSON document for `--output`.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::object::Segment;
use tabled::settings::{Alignment, Modify, Style};

use super::stats::Stats;

/// Latency figures of one stats object, in milliseconds
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    fn from_stats(stats: &Stats) -> Self {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        Self {
            min_ms: ms(stats.min_latency()),
            p50_ms: ms(stats.percentile(50.0)),
            p95_ms: ms(stats.percentile(95.0)),
            p99_ms: ms(stats.percentile(99.0)),
            max_ms: ms(stats.max_latency()),
        }
    }
}

/// Counters of one stats object
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub iterations: u64,
    pub successes: u64,
    pub errors: u64,
    pub latency: LatencySummary,
}

impl KindSummary {
    fn from_stats(stats: &Stats) -> Self {
        Self {
            iterations: stats.iterations(),
            successes: stats.successes(),
            errors: stats.errors(),
            latency: LatencySummary::from_stats(stats),
        }
    }
}

/// One row of the error-details table
#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub message: String,
    pub count: u64,
    pub percent: f64,
}

/// Serializable view of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub concurrency: u32,
    pub duration_secs: f64,
    pub throughput: f64,
    pub total: KindSummary,
    pub reads: KindSummary,
    pub writes: KindSummary,
    pub errors: Vec<ErrorSummary>,
}

impl RunSummary {
    /// Build the summary from the merged stats
    pub fn new(
        concurrency: u32,
        duration: Duration,
        total: &Stats,
        reads: &Stats,
        writes: &Stats,
    ) -> Self {
        // Most frequent errors first
        let mut errors: Vec<ErrorSummary> = total
            .error_map()
            .iter()
            .map(|(message, &count)| ErrorSummary {
                message: message.clone(),
                count,
                percent: total.as_percent(count),
            })
            .collect();
        errors.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            concurrency,
            duration_secs: duration.as_secs_f64(),
            throughput: total.throughput(duration),
            total: KindSummary::from_stats(total),
            reads: KindSummary::from_stats(reads),
            writes: KindSummary::from_stats(writes),
            errors,
        }
    }

    fn percent(&self, val: u64) -> f64 {
        if self.total.iterations == 0 {
            0.0
        } else {
            val as f64 * 100.0 / self.total.iterations as f64
        }
    }

    /// Render the summary table
    pub fn summary_table(&self) -> String {
        let lat = &self.total.latency;
        let mut builder = Builder::default();
        builder.push_record(["Parameters", "Values"]);

        let rows: Vec<(&str, String)> = vec![
            ("Concurrency", self.concurrency.to_string()),
            ("Duration", format!("{:.2}s", self.duration_secs)),
            ("Iterations", self.total.iterations.to_string()),
            (
                "Successes",
                format!(
                    "{} ({:.2}%)",
                    self.total.successes,
                    self.percent(self.total.successes)
                ),
            ),
            (
                "Errors",
                format!("{} ({:.2}%)", self.total.errors, self.percent(self.total.errors)),
            ),
            ("Reads", self.reads.iterations.to_string()),
            ("Writes", self.writes.iterations.to_string()),
            ("IPS", format!("{:.2}", self.throughput)),
            ("Latency (max)", format_ms(lat.max_ms)),
            ("Latency (p99)", format_ms(lat.p99_ms)),
            ("Latency (p95)", format_ms(lat.p95_ms)),
            ("Latency (p50)", format_ms(lat.p50_ms)),
            ("Latency (min)", format_ms(lat.min_ms)),
        ];
        for (name, value) in rows {
            builder.push_record([name.to_string(), value]);
        }

        let mut table = builder.build();
        table
            .with(Style::ascii())
            .with(Modify::new(Segment::all()).with(Alignment::left()));
        table.to_string()
    }

    /// Render the error-details table (None when the run had no errors)
    pub fn error_table(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        let mut builder = Builder::default();
        builder.push_record(["Error", "Count", "%"]);
        for e in &self.errors {
            builder.push_record([
                e.message.clone(),
                e.count.to_string(),
                format!("{:.2}", e.percent),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::ascii())
            .with(Modify::new(Segment::all()).with(Alignment::left()));
        Some(table.to_string())
    }

    /// Print summary and error details to stdout
    pub fn print(&self) {
        println!("Summary");
        println!("{}", self.summary_table());
        if let Some(errors) = self.error_table() {
            println!("\nError Details");
            println!("{}", errors);
        }
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut file = File::create(path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

fn format_ms(ms: f64) -> String {
    format!("{:.3}ms", ms)
}
