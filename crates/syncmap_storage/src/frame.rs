//! Record log frames.
//!
//! Every mutation of a [`crate::KvStore`] is appended to the log as one
//! self-describing frame:
//!
//! ```text
//! | magic (4) | version (2) | op (1) | keyspace (1) | key_len (4) | value_len (4) | key | value | crc32 (4) |
//! ```
//!
//! Integers are little-endian. The CRC covers every byte before it.
//!
//! ## Recovery policy
//!
//! - A frame cut short by the end of the log is a torn write: the reader
//!   stops cleanly and reports where the valid prefix ends.
//! - A CRC mismatch, bad magic, unknown version, unknown op or keyspace out
//!   of range is corruption and aborts the read with an error.

use crate::error::{StorageError, StorageResult};
use crate::keyspace::Keyspace;

/// Magic bytes opening every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"SMKV";

/// Current frame format version.
pub const FRAME_VERSION: u16 = 1;

/// magic (4) + version (2) + op (1) + keyspace (1) + key_len (4) + value_len (4)
const HEADER_SIZE: usize = 16;

const CRC_SIZE: usize = 4;

/// Kind of mutation a frame records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameOp {
    /// Insert or overwrite a key.
    Put = 1,
    /// Remove a key.
    Delete = 2,
}

impl FrameOp {
    /// Converts a byte to an op.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            _ => None,
        }
    }

    /// Converts the op to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// What the frame does.
    pub op: FrameOp,
    /// Keyspace the key lives in.
    pub keyspace: Keyspace,
    /// Raw key.
    pub key: Vec<u8>,
    /// Raw value. Empty for deletes.
    pub value: Vec<u8>,
}

impl Frame {
    /// Creates a put frame.
    pub fn put(keyspace: Keyspace, key: &[u8], value: &[u8]) -> Self {
        Self {
            op: FrameOp::Put,
            keyspace,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    /// Creates a delete frame.
    pub fn delete(keyspace: Keyspace, key: &[u8]) -> Self {
        Self {
            op: FrameOp::Delete,
            keyspace,
            key: key.to_vec(),
            value: Vec::new(),
        }
    }

    /// Encodes the frame with its envelope and checksum.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TooLarge`] if the key or value does not fit
    /// the 4-byte length fields.
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        let key_len = u32::try_from(self.key.len()).map_err(|_| StorageError::TooLarge {
            what: "key",
            len: self.key.len(),
        })?;
        let value_len = u32::try_from(self.value.len()).map_err(|_| StorageError::TooLarge {
            what: "value",
            len: self.value.len(),
        })?;

        let mut buf =
            Vec::with_capacity(HEADER_SIZE + self.key.len() + self.value.len() + CRC_SIZE);
        buf.extend_from_slice(&FRAME_MAGIC);
        buf.extend_from_slice(&FRAME_VERSION.to_le_bytes());
        buf.push(self.op.as_byte());
        buf.push(self.keyspace.id());
        buf.extend_from_slice(&key_len.to_le_bytes());
        buf.extend_from_slice(&value_len.to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        Ok(buf)
    }

    /// Returns the encoded size of this frame in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len() + CRC_SIZE
    }
}

/// Streams frames out of a log image.
///
/// Yields `(offset, frame)` pairs. After iteration finishes,
/// [`FrameReader::valid_len`] tells how many leading bytes formed complete
/// frames and [`FrameReader::torn`] whether a partial frame followed them.
pub struct FrameReader<'a> {
    data: &'a [u8],
    offset: usize,
    torn: bool,
    failed: bool,
}

impl<'a> FrameReader<'a> {
    /// Creates a reader over a full log image.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            torn: false,
            failed: false,
        }
    }

    /// Number of bytes consumed by complete, valid frames.
    #[must_use]
    pub fn valid_len(&self) -> u64 {
        self.offset as u64
    }

    /// True if the log ended in the middle of a frame.
    #[must_use]
    pub fn torn(&self) -> bool {
        self.torn
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[at..at + 4]);
        u32::from_le_bytes(raw)
    }

    fn next_frame(&mut self) -> StorageResult<Option<(u64, Frame)>> {
        let start = self.offset;
        let offset = start as u64;
        let rest = &self.data[start..];

        if rest.is_empty() {
            return Ok(None);
        }
        if rest.len() < HEADER_SIZE {
            self.torn = true;
            return Ok(None);
        }

        if rest[0..4] != FRAME_MAGIC {
            return Err(StorageError::corrupted(offset, "invalid frame magic"));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != FRAME_VERSION {
            return Err(StorageError::corrupted(
                offset,
                format!("unsupported frame version {version}"),
            ));
        }

        let key_len = Self::read_u32(rest, 8) as usize;
        let value_len = Self::read_u32(rest, 12) as usize;
        let body_end = HEADER_SIZE
            .checked_add(key_len)
            .and_then(|n| n.checked_add(value_len))
            .ok_or_else(|| StorageError::corrupted(offset, "frame length overflow"))?;
        let Some(frame_end) = body_end.checked_add(CRC_SIZE) else {
            return Err(StorageError::corrupted(offset, "frame length overflow"));
        };
        if rest.len() < frame_end {
            self.torn = true;
            return Ok(None);
        }

        let expected = Self::read_u32(rest, body_end);
        let actual = crc32fast::hash(&rest[..body_end]);
        if expected != actual {
            return Err(StorageError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let op = FrameOp::from_byte(rest[6])
            .ok_or_else(|| StorageError::corrupted(offset, format!("unknown op {}", rest[6])))?;
        let keyspace = Keyspace::new(rest[7]).ok_or_else(|| {
            StorageError::corrupted(offset, format!("keyspace {} out of range", rest[7]))
        })?;
        if op == FrameOp::Delete && value_len != 0 {
            return Err(StorageError::corrupted(offset, "delete frame carries a value"));
        }

        let key_start = HEADER_SIZE;
        let value_start = key_start + key_len;
        let frame = Frame {
            op,
            keyspace,
            key: rest[key_start..value_start].to_vec(),
            value: rest[value_start..body_end].to_vec(),
        };

        self.offset = start + frame_end;
        Ok(Some((offset, frame)))
    }
}

impl Iterator for FrameReader<'_> {
    type Item = StorageResult<(u64, Frame)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.torn {
            return None;
        }
        match self.next_frame() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
