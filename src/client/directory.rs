//! Topology discovery
//!
//! The `Directory` trait hides where the replica list and the leader come
//! from. `MasterDirectory` asks the cluster master over TCP; `StaticDirectory`
//! serves addresses given on the command line.
//!
//! Directory protocol (little endian):
//! - request: one tag byte, `GET_REPLICA_LIST` or `GET_LEADER`
//! - replica list reply: `u32` count, then per replica `u32` length + UTF-8 bytes
//! - leader reply: `i32` replica index

use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::utils::DiscoveryError;

/// Tag requesting the ordered replica list
pub const GET_REPLICA_LIST: u8 = 1;

/// Tag requesting the current leader index
pub const GET_LEADER: u8 = 2;

/// Upper bound on a single replica address, guards against garbage lengths
const MAX_ADDR_LEN: u32 = 1024;

/// Source of cluster topology
pub trait Directory {
    /// Ordered list of replica addresses
    fn replica_list(&mut self) -> Result<Vec<String>, DiscoveryError>;

    /// Index of the current leader in the replica list
    fn leader(&mut self) -> Result<usize, DiscoveryError>;
}

/// Topology fixed at startup
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    replicas: Vec<String>,
    leader: usize,
}

impl StaticDirectory {
    pub fn new(replicas: Vec<String>, leader: usize) -> Self {
        Self { replicas, leader }
    }
}

impl Directory for StaticDirectory {
    fn replica_list(&mut self) -> Result<Vec<String>, DiscoveryError> {
        if self.replicas.is_empty() {
            return Err(DiscoveryError::EmptyReplicaList);
        }
        Ok(self.replicas.clone())
    }

    fn leader(&mut self) -> Result<usize, DiscoveryError> {
        Ok(self.leader)
    }
}

/// Directory client talking to the cluster master
pub struct MasterDirectory {
    writer: BufWriter<TcpStream>,
    reader: BufReader<TcpStream>,
}

impl MasterDirectory {
    /// Connect to the master at `addr`
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, DiscoveryError> {
        let unreachable = |source: io::Error| DiscoveryError::Unreachable {
            addr: addr.to_string(),
            source,
        };

        let sock_addr = addr
            .to_socket_addrs()
            .map_err(unreachable)?
            .next()
            .ok_or_else(|| {
                unreachable(io::Error::new(io::ErrorKind::NotFound, "No addresses found"))
            })?;
        let stream = TcpStream::connect_timeout(&sock_addr, timeout).map_err(unreachable)?;
        stream.set_read_timeout(Some(timeout)).ok();
        stream.set_write_timeout(Some(timeout)).ok();

        let writer = BufWriter::new(stream.try_clone().map_err(unreachable)?);
        let reader = BufReader::new(stream);
        Ok(Self { writer, reader })
    }

    fn request(&mut self, tag: u8) -> io::Result<()> {
        self.writer.write_u8(tag)?;
        self.writer.flush()
    }
}

impl Directory for MasterDirectory {
    fn replica_list(&mut self) -> Result<Vec<String>, DiscoveryError> {
        self.request(GET_REPLICA_LIST)
            .map_err(DiscoveryError::ReplicaList)?;
        let replicas = read_replica_list(&mut self.reader).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => DiscoveryError::Malformed(e.to_string()),
            _ => DiscoveryError::ReplicaList(e),
        })?;
        if replicas.is_empty() {
            return Err(DiscoveryError::EmptyReplicaList);
        }
        Ok(replicas)
    }

    fn leader(&mut self) -> Result<usize, DiscoveryError> {
        self.request(GET_LEADER).map_err(DiscoveryError::Leader)?;
        let leader = read_leader(&mut self.reader).map_err(DiscoveryError::Leader)?;
        usize::try_from(leader)
            .map_err(|_| DiscoveryError::Malformed(format!("negative leader id {}", leader)))
    }
}

/// Encode a replica list reply
pub fn write_replica_list<W: Write>(writer: &mut W, replicas: &[String]) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(replicas.len() as u32)?;
    for addr in replicas {
        writer.write_u32::<LittleEndian>(addr.len() as u32)?;
        writer.write_all(addr.as_bytes())?;
    }
    Ok(())
}

/// Decode a replica list reply
pub fn read_replica_list<R: Read>(reader: &mut R) -> io::Result<Vec<String>> {
    let count = reader.read_u32::<LittleEndian>()?;
    let mut replicas = Vec::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        let len = reader.read_u32::<LittleEndian>()?;
        if len > MAX_ADDR_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("replica address length {} too large", len),
            ));
        }
        let mut buf = vec![0u8; len as usize];
        reader.read_exact(&mut buf)?;
        let addr = String::from_utf8(buf).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
        })?;
        replicas.push(addr);
    }
    Ok(replicas)
}

/// Encode a leader reply
pub fn write_leader<W: Write>(writer: &mut W, leader: i32) -> io::Result<()> {
    writer.write_i32::<LittleEndian>(leader)
}

/// Decode a leader reply
pub fn read_leader<R: Read>(reader: &mut R) -> io::Result<i32> {
    reader.read_i32::<LittleEndian>()
}
