//! smr-bench - closed-loop load generator for state-machine-replication clusters
//!
//! Discovers the replicas through the cluster master (or takes them from the
//! command line), runs the configured number of simulated clients and prints
//! latency and throughput statistics.

use anyhow::{Context, Result};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use smr_bench::benchmark::Orchestrator;
use smr_bench::config::{BenchConfig, CliArgs};

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn print_banner(config: &BenchConfig, orchestrator: &Orchestrator) {
    if config.quiet {
        return;
    }

    println!("smr-bench v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================");
    for (i, addr) in orchestrator.replicas().iter().enumerate() {
        println!("Replica {}: {}", i, addr);
    }
    if config.no_leader {
        println!("Mode: leaderless{}", if config.bar_one { " (bar one)" } else { "" });
    } else {
        println!("Leader: {}", orchestrator.leader());
    }
    println!(
        "Clients: {}, Requests/client: {}, Writes: {}%",
        config.clients, config.requests, config.write_percent
    );
    println!(
        "Keys: {} from {}, {}",
        config.keyspace_len, config.start_range, config.key_selection
    );
    println!("====================================\n");
}

fn run() -> Result<()> {
    let args = CliArgs::parse_args();
    setup_logging(args.verbose, args.quiet)?;

    let config =
        BenchConfig::from_cli(&args).map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let concurrency = config.clients;
    let output_path = config.output_path.clone();
    let quiet = config.quiet;

    let orchestrator = Orchestrator::from_config(config).context("Topology discovery failed")?;
    print_banner(orchestrator.config(), &orchestrator);

    let result = orchestrator.run()?;
    let summary = result.summary(concurrency);

    if !quiet {
        summary.print();
    }

    if let Some(path) = output_path {
        summary
            .write_json(&path)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        info!("Results written to {}", path.display());
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
