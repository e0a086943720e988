//! Utility modules

pub mod error;

pub use error::{BenchError, ConnectionError, DiscoveryError, ProtocolError, Result};
