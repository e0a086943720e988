//! In-process mock cluster
//!
//! `MockReplica` answers the replica wire protocol and `MockMaster` serves the
//! directory protocol. Both listen on loopback ports and handle each
//! connection on its own thread. They back the end-to-end tests and the
//! `mock_cluster` binary.

use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use byteorder::ReadBytesExt;
use parking_lot::Mutex;
use tracing::debug;

use super::directory::{write_leader, write_replica_list, GET_LEADER, GET_REPLICA_LIST};
use crate::protocol::{Propose, ProposeReply, PROPOSE};

/// How a mock replica answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Reply with ok = 1
    Accept,
    /// Reply with ok = 0
    Reject,
    /// Reply with ok = 1 after sleeping
    Delay(Duration),
    /// Read the request, then close the connection without replying
    Hangup,
}

/// Mock replica server
pub struct MockReplica {
    addr: String,
    received: Arc<Mutex<Vec<Propose>>>,
}

impl MockReplica {
    /// Start a replica on an ephemeral loopback port
    pub fn spawn(behavior: MockBehavior) -> io::Result<Self> {
        Self::bind("127.0.0.1:0", behavior)
    }

    /// Start a replica on a specific address
    pub fn bind(addr: &str, behavior: MockBehavior) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?.to_string();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        thread::Builder::new()
            .name(format!("mock-replica-{}", addr))
            .spawn(move || {
                for stream in listener.incoming().flatten() {
                    let log = Arc::clone(&log);
                    thread::spawn(move || {
                        if let Err(e) = serve_replica(stream, behavior, &log) {
                            debug!("mock replica connection ended: {}", e);
                        }
                    });
                }
            })?;

        Ok(Self { addr, received })
    }

    pub fn addr(&self) -> String {
        self.addr.clone()
    }

    /// Requests received so far, in arrival order
    pub fn received(&self) -> Vec<Propose> {
        self.received.lock().clone()
    }
}

fn serve_replica(
    stream: TcpStream,
    behavior: MockBehavior,
    log: &Mutex<Vec<Propose>>,
) -> io::Result<()> {
    stream.set_nodelay(true).ok();
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    loop {
        let tag = match reader.read_u8() {
            Ok(tag) => tag,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        if tag != PROPOSE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected tag {}", tag),
            ));
        }

        let propose = Propose::unmarshal(&mut reader)?;
        log.lock().push(propose);

        let ok = match behavior {
            MockBehavior::Accept => 1,
            MockBehavior::Reject => 0,
            MockBehavior::Delay(d) => {
                thread::sleep(d);
                1
            }
            MockBehavior::Hangup => return Ok(()),
        };

        ProposeReply {
            ok,
            command_id: propose.command_id,
            value: propose.value,
            timestamp: propose.timestamp,
        }
        .marshal(&mut writer)?;
        writer.flush()?;
    }
}

/// Mock master serving the directory protocol
pub struct MockMaster {
    addr: String,
}

impl MockMaster {
    /// Start a master on an ephemeral loopback port
    pub fn spawn(replicas: Vec<String>, leader: i32) -> io::Result<Self> {
        Self::bind("127.0.0.1:0", replicas, leader)
    }

    /// Start a master on a specific address
    pub fn bind(addr: &str, replicas: Vec<String>, leader: i32) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?.to_string();
        let replicas = Arc::new(replicas);

        thread::Builder::new()
            .name("mock-master".to_string())
            .spawn(move || {
                for stream in listener.incoming().flatten() {
                    let replicas = Arc::clone(&replicas);
                    thread::spawn(move || {
                        if let Err(e) = serve_master(stream, &replicas, leader) {
                            debug!("mock master connection ended: {}", e);
                        }
                    });
                }
            })?;

        Ok(Self { addr })
    }

    pub fn addr(&self) -> String {
        self.addr.clone()
    }
}

fn serve_master(stream: TcpStream, replicas: &[String], leader: i32) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);
    let mut tag = [0u8; 1];

    loop {
        if reader.read(&mut tag)? == 0 {
            return Ok(());
        }
        match tag[0] {
            GET_REPLICA_LIST => write_replica_list(&mut writer, replicas)?,
            GET_LEADER => write_leader(&mut writer, leader)?,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unexpected directory tag {}", other),
                ))
            }
        }
        writer.flush()?;
    }
}
