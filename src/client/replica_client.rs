//! Per-client set of replica connections
//!
//! Every simulated client opens its own connection to each replica and keeps
//! them for its whole run. Connections are never shared between clients.
//! A replica that cannot be reached stays unusable; requests addressed to it
//! fail with [`ProtocolError::NotConnected`].

use std::time::{Duration, Instant};

use tracing::warn;

use super::replica_connection::ReplicaConnection;
use crate::config::BenchConfig;
use crate::protocol::{Propose, ProposeReply};
use crate::utils::ProtocolError;

/// Connection settings shared by all replica connections
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
}

impl ConnectionFactory {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
        }
    }

    /// Open connections to every replica, logging the ones that fail
    pub fn connect_all(&self, client_id: usize, replicas: &[String]) -> ReplicaClient {
        let connections = replicas
            .iter()
            .enumerate()
            .map(|(index, addr)| {
                match ReplicaConnection::connect(index, addr, self.connect_timeout, self.read_timeout)
                {
                    Ok(conn) => Some(conn),
                    Err(e) => {
                        warn!("Client {}: {}", client_id, e);
                        None
                    }
                }
            })
            .collect();

        ReplicaClient {
            client_id,
            connections,
        }
    }
}

/// Reply plus measured round-trip time
#[derive(Debug, Clone, Copy)]
pub struct Exchange {
    pub reply: ProposeReply,
    pub latency: Duration,
}

/// One simulated client's connections, indexed like the replica list
pub struct ReplicaClient {
    client_id: usize,
    connections: Vec<Option<ReplicaConnection>>,
}

impl ReplicaClient {
    /// Send `propose` to replica `target` and wait for the reply
    ///
    /// Latency covers writing the request through reading the reply. On an
    /// I/O error the connection is dropped, since the stream can no longer be
    /// trusted to line up requests and replies.
    pub fn exchange(&mut self, target: usize, propose: &Propose) -> Result<Exchange, ProtocolError> {
        let conn = self
            .connections
            .get_mut(target)
            .and_then(Option::as_mut)
            .ok_or(ProtocolError::NotConnected(target))?;

        let start = Instant::now();
        match conn.execute(propose) {
            Ok(reply) => Ok(Exchange {
                reply,
                latency: start.elapsed(),
            }),
            Err(e) => {
                warn!(
                    "Client {}: replica {} dropped after error: {}",
                    self.client_id, target, e
                );
                self.connections[target] = None;
                Err(e)
            }
        }
    }

    /// Number of replicas with a live connection
    pub fn connected(&self) -> usize {
        self.connections.iter().filter(|c| c.is_some()).count()
    }

    /// Number of replicas this client knows about
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every connection
    pub fn close(&mut self) {
        self.connections.iter_mut().for_each(|c| *c = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockBehavior, MockReplica};
    use crate::protocol::Operation;

    fn factory() -> ConnectionFactory {
        ConnectionFactory {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Some(Duration::from_secs(5)),
        }
    }

    fn dead_addr() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    }

    fn read_req(id: i32) -> Propose {
        Propose {
            command_id: id,
            op: Operation::Read,
            key: 1,
            value: 0,
            timestamp: 0,
        }
    }

    #[test]
    fn test_unreachable_replica_is_unusable() {
        let live = MockReplica::spawn(MockBehavior::Accept).unwrap();
        let replicas = vec![live.addr(), dead_addr()];

        let mut client = factory().connect_all(0, &replicas);
        assert_eq!(client.len(), 2);
        assert_eq!(client.connected(), 1);

        assert!(client.exchange(0, &read_req(0)).is_ok());
        assert!(matches!(
            client.exchange(1, &read_req(1)),
            Err(ProtocolError::NotConnected(1))
        ));
        assert!(matches!(
            client.exchange(7, &read_req(2)),
            Err(ProtocolError::NotConnected(7))
        ));
    }

    #[test]
    fn test_exchange_measures_latency() {
        let slow = MockReplica::spawn(MockBehavior::Delay(Duration::from_millis(20))).unwrap();
        let mut client = factory().connect_all(0, &[slow.addr()]);

        let exchange = client.exchange(0, &read_req(5)).unwrap();
        assert!(exchange.reply.is_ok());
        assert_eq!(exchange.reply.command_id, 5);
        assert!(exchange.latency >= Duration::from_millis(20));
    }

    #[test]
    fn test_failed_connection_is_dropped() {
        let replica = MockReplica::spawn(MockBehavior::Hangup).unwrap();
        let mut client = factory().connect_all(0, &[replica.addr()]);

        assert!(client.exchange(0, &read_req(0)).is_err());
        assert_eq!(client.connected(), 0);
        assert!(matches!(
            client.exchange(0, &read_req(1)),
            Err(ProtocolError::NotConnected(0))
        ));
    }

    #[test]
    fn test_close() {
        let replica = MockReplica::spawn(MockBehavior::Accept).unwrap();
        let mut client = factory().connect_all(0, &[replica.addr()]);
        client.close();
        assert_eq!(client.connected(), 0);
    }
}
