//! Client connection layer

pub mod directory;
pub mod mock;
pub mod replica_client;
pub mod replica_connection;

pub use directory::{Directory, MasterDirectory, StaticDirectory};
pub use replica_client::{ConnectionFactory, Exchange, ReplicaClient};
pub use replica_connection::ReplicaConnection;
