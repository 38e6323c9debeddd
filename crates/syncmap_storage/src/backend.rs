//! Log backend trait definition.

use crate::error::StorageResult;

/// Byte-level home of the engine's record log.
///
/// A backend is an **append-only byte log**. It knows nothing about frames,
/// keyspaces or keys; [`crate::KvStore`] owns the format and replays the log
/// on open.
///
/// # Invariants
///
/// - `append` writes the whole buffer contiguously and returns its offset
/// - `read_all` returns exactly the bytes appended so far
/// - `truncate` only ever shrinks the log
/// - `replace` swaps the whole log atomically: readers observe either the
///   old contents or the new ones, never a mix
pub trait LogBackend: Send + Sync {
    /// Reads the full contents of the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends `data` to the end of the log and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Makes every appended byte durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current log size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Cuts the log back to `new_size` bytes.
    ///
    /// Used by recovery to drop a torn trailing frame.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` exceeds the current size or the
    /// truncation fails.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Atomically replaces the whole log with `contents`.
    ///
    /// Used by compaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the new contents cannot be made durable.
    fn replace(&mut self, contents: &[u8]) -> StorageResult<()>;
}
