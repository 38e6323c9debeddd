//! Error types for engine operations.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while opening or using a [`crate::KvStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The record log is malformed.
    #[error("store corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset of the offending frame.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A frame's stored checksum does not match its contents.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Byte offset of the offending frame.
        offset: u64,
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed from the frame contents.
        actual: u32,
    },

    /// Another handle holds the store directory lock.
    #[error("store locked: another handle has exclusive access to {0}")]
    Locked(String),

    /// The store directory does not exist and creation was not requested.
    #[error("store not found: {0}")]
    NotFound(String),

    /// A key or value exceeds the frame length field.
    #[error("{what} too large: {len} bytes")]
    TooLarge {
        /// Which part of the entry was too large.
        what: &'static str,
        /// Its length in bytes.
        len: usize,
    },

    /// The backend has been closed or the write was rejected.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Creates a corruption error for the frame at `offset`.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Returns true if the error means the persisted data cannot be trusted.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupted { .. } | Self::ChecksumMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_classification() {
        assert!(StorageError::corrupted(12, "bad magic").is_corruption());
        assert!(StorageError::ChecksumMismatch {
            offset: 0,
            expected: 1,
            actual: 2
        }
        .is_corruption());
        assert!(!StorageError::Closed.is_corruption());
        assert!(!StorageError::Locked("db".into()).is_corruption());
    }

    #[test]
    fn error_display() {
        let err = StorageError::ChecksumMismatch {
            offset: 32,
            expected: 0xdead_beef,
            actual: 0x0000_0001,
        };
        let text = err.to_string();
        assert!(text.contains("offset 32"));
        assert!(text.contains("deadbeef"));

        let err = StorageError::TooLarge {
            what: "value",
            len: 9,
        };
        assert_eq!(err.to_string(), "value too large: 9 bytes");
    }
}
