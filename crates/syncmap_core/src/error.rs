//! Error types for the record mapping store.

use std::io;
use syncmap_storage::StorageError;
use thiserror::Error;

/// Result type for mapping operations.
pub type MapResult<T> = Result<T, MapError>;

/// Errors that can occur inside the mapping store.
///
/// These never cross the public [`ObjectMap`](crate::ObjectMap) boundary:
/// every operation there resolves to its failure value (`false`, a miss, or
/// an empty set) and the error itself goes to the
/// [`MapObserver`](crate::MapObserver).
#[derive(Debug, Error)]
pub enum MapError {
    /// The store could not be opened. Every access retries the open.
    #[error("failed to open store: {0}")]
    StoreOpen(#[source] StorageError),

    /// A single get, put or delete failed.
    #[error("store operation failed: {0}")]
    StoreIo(#[from] StorageError),

    /// A stored payload did not parse.
    #[error("decode error: {message}")]
    Decode {
        /// Description of the payload problem.
        message: String,
    },

    /// The caller broke the usage contract.
    #[error("contract violation: {message}")]
    ContractViolation {
        /// What was violated.
        message: String,
    },

    /// The serialized lane could not be started.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The serialized lane no longer accepts work.
    #[error("mapping lane is closed")]
    LaneClosed,
}

impl MapError {
    /// Creates a contract violation error.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns true for contract violations.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation { .. })
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}
