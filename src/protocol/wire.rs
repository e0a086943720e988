//! Replica wire format
//!
//! A request is a one-byte tag followed by a fixed-layout `Propose` record;
//! the replica answers with a fixed-layout `ProposeReply`. All integers are
//! little endian. Both records stream forward only, so they can be written
//! straight into a `BufWriter` and read from a `BufReader`.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Tag byte preceding a `Propose`
pub const PROPOSE: u8 = 0;

/// Encoded size of a `Propose` (without the tag byte)
pub const PROPOSE_SIZE: usize = 29;

/// Encoded size of a `ProposeReply`
pub const PROPOSE_REPLY_SIZE: usize = 21;

/// Key-value operation carried by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read a key
    Read,
    /// Write a key
    Write,
}

impl Operation {
    const PUT: u8 = 1;
    const GET: u8 = 2;

    /// Wire code of the operation
    pub fn code(self) -> u8 {
        match self {
            Operation::Write => Self::PUT,
            Operation::Read => Self::GET,
        }
    }

    /// Parse a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            Self::PUT => Some(Operation::Write),
            Self::GET => Some(Operation::Read),
            _ => None,
        }
    }

    pub fn is_write(self) -> bool {
        self == Operation::Write
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

/// Client request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propose {
    pub command_id: i32,
    pub op: Operation,
    pub key: i64,
    pub value: i64,
    pub timestamp: i64,
}

impl Propose {
    pub fn marshal<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(self.command_id)?;
        writer.write_u8(self.op.code())?;
        writer.write_i64::<LittleEndian>(self.key)?;
        writer.write_i64::<LittleEndian>(self.value)?;
        writer.write_i64::<LittleEndian>(self.timestamp)?;
        Ok(())
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> io::Result<Self> {
        let command_id = reader.read_i32::<LittleEndian>()?;
        let code = reader.read_u8()?;
        let op = Operation::from_code(code).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("unknown operation {}", code))
        })?;
        Ok(Self {
            command_id,
            op,
            key: reader.read_i64::<LittleEndian>()?,
            value: reader.read_i64::<LittleEndian>()?,
            timestamp: reader.read_i64::<LittleEndian>()?,
        })
    }
}

/// Replica reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposeReply {
    /// Nonzero when the command was applied
    pub ok: u8,
    pub command_id: i32,
    pub value: i64,
    pub timestamp: i64,
}

impl ProposeReply {
    pub fn is_ok(&self) -> bool {
        self.ok != 0
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.ok)?;
        writer.write_i32::<LittleEndian>(self.command_id)?;
        writer.write_i64::<LittleEndian>(self.value)?;
        writer.write_i64::<LittleEndian>(self.timestamp)?;
        Ok(())
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            ok: reader.read_u8()?,
            command_id: reader.read_i32::<LittleEndian>()?,
            value: reader.read_i64::<LittleEndian>()?,
            timestamp: reader.read_i64::<LittleEndian>()?,
        })
    }
}
