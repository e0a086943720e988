//! TCP connection to a single replica
//!
//! The stream is split into a buffered writer and a buffered reader over
//! clones of the same socket. Requests are strictly synchronous: one request
//! is written and flushed, then the matching reply is read before anything
//! else is sent.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::WriteBytesExt;

use crate::protocol::{Propose, ProposeReply, PROPOSE};
use crate::utils::{ConnectionError, ProtocolError};

/// Connection to one replica
pub struct ReplicaConnection {
    writer: BufWriter<TcpStream>,
    reader: BufReader<TcpStream>,
}

impl ReplicaConnection {
    /// Open a connection to replica `index` at `addr`
    pub fn connect(
        index: usize,
        addr: &str,
        connect_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self, ConnectionError> {
        let connect_failed = |source: io::Error| ConnectionError::ConnectFailed {
            index,
            addr: addr.to_string(),
            source,
        };

        let sock_addr: SocketAddr = addr
            .to_socket_addrs()
            .map_err(connect_failed)?
            .next()
            .ok_or_else(|| {
                connect_failed(io::Error::new(io::ErrorKind::NotFound, "No addresses found"))
            })?;

        let stream = TcpStream::connect_timeout(&sock_addr, connect_timeout).map_err(connect_failed)?;

        // Small request/reply records, so never wait for Nagle
        stream.set_nodelay(true).ok();
        stream.set_read_timeout(read_timeout).map_err(connect_failed)?;

        let writer = BufWriter::with_capacity(4096, stream.try_clone().map_err(connect_failed)?);
        let reader = BufReader::with_capacity(4096, stream);

        Ok(Self { writer, reader })
    }

    /// Write the tagged request and flush it
    pub fn send(&mut self, propose: &Propose) -> Result<(), ProtocolError> {
        self.writer.write_u8(PROPOSE).map_err(ProtocolError::Write)?;
        propose.marshal(&mut self.writer).map_err(ProtocolError::Write)?;
        self.writer.flush().map_err(ProtocolError::Write)
    }

    /// Block until the next reply is read
    pub fn receive(&mut self) -> Result<ProposeReply, ProtocolError> {
        ProposeReply::unmarshal(&mut self.reader).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => ProtocolError::InvalidReply(e.to_string()),
            _ => ProtocolError::Read(e),
        })
    }

    /// Send a request and wait for its reply
    pub fn execute(&mut self, propose: &Propose) -> Result<ProposeReply, ProtocolError> {
        self.send(propose)?;
        self.receive()
    }
}

impl Drop for ReplicaConnection {
    fn drop(&mut self) {
        self.writer.flush().ok();
        self.reader.get_ref().shutdown(Shutdown::Both).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockBehavior, MockReplica};
    use crate::protocol::Operation;

    fn propose(id: i32) -> Propose {
        Propose {
            command_id: id,
            op: Operation::Write,
            key: 10,
            value: 0,
            timestamp: 0,
        }
    }

    #[test]
    fn test_execute_against_mock() {
        let replica = MockReplica::spawn(MockBehavior::Accept).expect("mock replica");
        let mut conn =
            ReplicaConnection::connect(0, &replica.addr(), Duration::from_secs(5), None)
                .expect("connect");

        let reply = conn.execute(&propose(3)).expect("reply");
        assert!(reply.is_ok());
        assert_eq!(reply.command_id, 3);
        assert_eq!(replica.received().len(), 1);
    }

    #[test]
    fn test_hangup_is_read_error() {
        let replica = MockReplica::spawn(MockBehavior::Hangup).expect("mock replica");
        let mut conn =
            ReplicaConnection::connect(0, &replica.addr(), Duration::from_secs(5), None)
                .expect("connect");

        let err = conn.execute(&propose(1)).unwrap_err();
        assert!(matches!(err, ProtocolError::Read(_) | ProtocolError::Write(_)));
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let err = ReplicaConnection::connect(4, &addr, Duration::from_secs(1), None)
            .err()
            .expect("connection should fail");
        assert!(matches!(err, ConnectionError::ConnectFailed { index: 4, .. }));
    }
}
