//! Local mock cluster for smoke runs
//!
//! Starts a master and a set of replicas on loopback ports. Point smr-bench at
//! the printed master address.

use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use smr_bench::client::mock::{MockBehavior, MockMaster, MockReplica};

#[derive(Parser, Debug)]
#[command(name = "mock_cluster", about = "In-process mock SMR cluster")]
struct Args {
    /// Number of replicas
    #[arg(short = 'n', long, default_value_t = 3)]
    replicas: u16,

    /// Port of the first replica (following replicas use consecutive ports)
    #[arg(long, default_value_t = 7070)]
    base_port: u16,

    /// Master port
    #[arg(long, default_value_t = 7087)]
    master_port: u16,

    /// Leader index reported by the master
    #[arg(long, default_value_t = 0)]
    leader: i32,

    /// Answer every request with ok = 0
    #[arg(long)]
    reject: bool,

    /// Per-request delay in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_target(false)
            .finish(),
    )
    .context("Failed to set tracing subscriber")?;

    let behavior = if args.reject {
        MockBehavior::Reject
    } else if args.delay_ms > 0 {
        MockBehavior::Delay(std::time::Duration::from_millis(args.delay_ms))
    } else {
        MockBehavior::Accept
    };

    let mut replicas = Vec::with_capacity(args.replicas as usize);
    for i in 0..args.replicas {
        let port = args
            .base_port
            .checked_add(i)
            .context("Replica port out of range")?;
        let replica = MockReplica::bind(&format!("127.0.0.1:{}", port), behavior)
            .with_context(|| format!("Failed to bind replica {} on port {}", i, port))?;
        info!("Replica {}: {} ({:?})", i, replica.addr(), behavior);
        replicas.push(replica);
    }

    let addrs = replicas.iter().map(MockReplica::addr).collect();
    let master = MockMaster::bind(&format!("127.0.0.1:{}", args.master_port), addrs, args.leader)
        .context("Failed to bind master")?;
    info!("Master: {} (leader {})", master.addr(), args.leader);

    loop {
        thread::park();
    }
}
