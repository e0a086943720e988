//! Error types for smr-bench

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Topology discovery errors (always fatal for the run)
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to reach master at {addr}: {source}")]
    Unreachable { addr: String, source: io::Error },

    #[error("Replica list request failed: {0}")]
    ReplicaList(io::Error),

    #[error("Leader request failed: {0}")]
    Leader(io::Error),

    #[error("Master returned an empty replica list")]
    EmptyReplicaList,

    #[error("Master reported leader {leader} but only {replicas} replicas exist")]
    LeaderOutOfRange { leader: i64, replicas: usize },

    #[error("Malformed directory response: {0}")]
    Malformed(String),
}

/// Replica connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to replica {index} at {addr}: {source}")]
    ConnectFailed {
        index: usize,
        addr: String,
        source: io::Error,
    },
}

/// Per-request protocol errors
///
/// The `Display` text of these errors is used as the failure reason in
/// [`crate::metrics::Stats`], so messages stay short and free of per-request
/// detail that would split the error table into one row per request.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("replica {0} not connected")]
    NotConnected(usize),

    #[error("write failed: {0}")]
    Write(io::Error),

    #[error("read failed: {0}")]
    Read(io::Error),

    #[error("invalid reply: {0}")]
    InvalidReply(String),

    #[error("request rejected by replica")]
    Rejected,
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_reasons_are_stable() {
        assert_eq!(ProtocolError::NotConnected(2).to_string(), "replica 2 not connected");
        assert_eq!(ProtocolError::Rejected.to_string(), "request rejected by replica");

        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "failed to fill whole buffer");
        assert_eq!(
            ProtocolError::Read(eof).to_string(),
            "read failed: failed to fill whole buffer"
        );
    }

    #[test]
    fn test_discovery_error_converts_to_bench_error() {
        let err: BenchError = DiscoveryError::EmptyReplicaList.into();
        assert!(matches!(err, BenchError::Discovery(_)));
        assert!(err.to_string().starts_with("Discovery error:"));
    }
}
