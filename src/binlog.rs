//! Binlog record: the fixed-layout wire format that the [`crate::queue`]
//! stages into the same batch as each user mutation. Layout (§3.1,
//! little-endian on the wire):
//!
//! ```text
//! offset  size  field
//! 0       8     seq     u64, strictly increasing
//! 8       1     type    BinlogType
//! 9       1     cmd     Command
//! 10      var   key     raw encoded key of the mutated entry
//! ```
//!
//! No length prefix on `key`: the enclosing store value is already
//! self-delimited by the engine.

use std::fmt::Display;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

const HEADER_LEN: usize = 10;

/// Binlog entry type, the first payload byte after `seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BinlogType {
    Noop = 0,
    Mirror = 1,
    Copy = 2,
    Sync = 4,
}

impl BinlogType {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(BinlogType::Noop),
            1 => Ok(BinlogType::Mirror),
            2 => Ok(BinlogType::Copy),
            4 => Ok(BinlogType::Sync),
            other => Err(Error::Decode(format!("unknown binlog type {other:#x}"))),
        }
    }

    fn name(self) -> &'static str {
        match self {
            BinlogType::Noop => "noop",
            BinlogType::Mirror => "mirror",
            BinlogType::Copy => "copy",
            BinlogType::Sync => "sync",
        }
    }
}

/// Command identifier: which typed operation produced this record.
/// Stable numeric IDs, part of the on-disk/wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    None = 0,
    Set = 1,
    Del = 2,
    HSet = 3,
    HDel = 4,
    ZSet = 5,
    ZDel = 6,
    QSet = 7,
    QPushBack = 8,
    QPushFront = 9,
    QPopBack = 10,
    QPopFront = 11,
}

impl Command {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Command::None),
            1 => Ok(Command::Set),
            2 => Ok(Command::Del),
            3 => Ok(Command::HSet),
            4 => Ok(Command::HDel),
            5 => Ok(Command::ZSet),
            6 => Ok(Command::ZDel),
            7 => Ok(Command::QSet),
            8 => Ok(Command::QPushBack),
            9 => Ok(Command::QPushFront),
            10 => Ok(Command::QPopBack),
            11 => Ok(Command::QPopFront),
            other => Err(Error::Decode(format!("unknown binlog cmd {other:#x}"))),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Command::None => "none",
            Command::Set => "set",
            Command::Del => "del",
            Command::HSet => "hset",
            Command::HDel => "hdel",
            Command::ZSet => "zset",
            Command::ZDel => "zdel",
            Command::QSet => "qset",
            Command::QPushBack => "qpush_back",
            Command::QPushFront => "qpush_front",
            Command::QPopBack => "qpop_back",
            Command::QPopFront => "qpop_front",
        }
    }
}

/// One parsed (or about-to-be-written) binlog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binlog {
    seq: u64,
    typ: BinlogType,
    cmd: Command,
    key: Vec<u8>,
}

impl Binlog {
    pub fn make(seq: u64, typ: BinlogType, cmd: Command, key: &[u8]) -> Self {
        Binlog {
            seq,
            typ,
            cmd,
            key: key.to_vec(),
        }
    }

    /// Parses a record from its wire bytes. Fails if shorter than the
    /// 10-byte fixed header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Decode(format!(
                "binlog record too short: {} bytes",
                bytes.len()
            )));
        }
        let seq = LittleEndian::read_u64(&bytes[0..8]);
        let typ = BinlogType::from_u8(bytes[8])?;
        let cmd = Command::from_u8(bytes[9])?;
        let key = bytes[HEADER_LEN..].to_vec();
        Ok(Binlog { seq, typ, cmd, key })
    }

    /// Re-expresses the original's in-place `update()` (binlog.h:87):
    /// overwrites this record's own fields rather than building a new
    /// one. Used by replicator-apply code outside this crate that needs
    /// to stamp a remote record with a local seq before restaging it;
    /// this crate's own writers always go through `make`.
    pub fn rebuild(&mut self, seq: u64, typ: BinlogType, cmd: Command, key: &[u8]) {
        self.seq = seq;
        self.typ = typ;
        self.cmd = cmd;
        self.key.clear();
        self.key.extend_from_slice(key);
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn typ(&self) -> BinlogType {
        self.typ
    }

    pub fn cmd(&self) -> Command {
        self.cmd
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Serializes this record to its wire bytes (§3.1).
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.key.len());
        let mut seq_buf = [0u8; 8];
        LittleEndian::write_u64(&mut seq_buf, self.seq);
        out.extend_from_slice(&seq_buf);
        out.push(self.typ as u8);
        out.push(self.cmd as u8);
        out.extend_from_slice(&self.key);
        out
    }
}

impl Display for Binlog {
    /// One-line human form: `"seq type.name cmd.name hex(key)"`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.seq,
            self.typ.name(),
            self.cmd.name(),
            crate::bytes::hex_dump(&self.key)
        )
    }
}
