//! The ordered key-value store.

use crate::backend::LogBackend;
use crate::dir::StoreDir;
use crate::error::{StorageError, StorageResult};
use crate::file::FileLog;
use crate::frame::{Frame, FrameOp, FrameReader};
use crate::keyspace::Keyspace;
use crate::memory::MemoryLog;
use std::collections::BTreeMap;
use std::path::Path;

/// Logs with fewer frames than this are never compacted on open.
const MIN_FRAMES_FOR_COMPACTION: u64 = 256;

/// Options for opening a [`KvStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Create the store directory if it does not exist.
    pub create_if_missing: bool,

    /// Sync the log after every mutation.
    pub sync_on_write: bool,

    /// Compact on open once the log holds this many frames per live entry.
    /// `None` disables automatic compaction.
    pub compact_ratio: Option<u32>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            compact_ratio: Some(4),
        }
    }
}

impl StoreOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync after every mutation.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the automatic compaction ratio.
    #[must_use]
    pub const fn compact_ratio(mut self, ratio: Option<u32>) -> Self {
        self.compact_ratio = ratio;
        self
    }
}

/// Point-in-time statistics about a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Frames currently in the log.
    pub frames: u64,
    /// Live entries across all keyspaces.
    pub live_entries: usize,
    /// Log size in bytes.
    pub log_bytes: u64,
}

/// An embedded, ordered byte-string key-value store.
///
/// Mutations are appended to a frame log; the full key set is held in one
/// ordered map per [`Keyspace`], rebuilt from the log on open.
///
/// # Guarantees
///
/// - Each `put`/`delete` is one frame, so single-key updates are atomic
/// - With `sync_on_write`, a returned `Ok` means the mutation is durable
/// - The in-memory view is only updated after the frame is appended, so a
///   failed write leaves the store as it was
/// - A failed append or sync is cut back out of the log; if that cut fails
///   too, every later write fails with [`StorageError::Closed`]
///
/// # Example
///
/// ```rust
/// use syncmap_storage::{KvStore, Keyspace};
///
/// let mut store = KvStore::open_in_memory();
/// store.put(Keyspace::DEFAULT, b"b42", b"payload").unwrap();
/// assert_eq!(store.get(Keyspace::DEFAULT, b"b42"), Some(&b"payload"[..]));
/// assert_eq!(store.get(Keyspace::INDEX, b"b42"), None);
/// ```
pub struct KvStore {
    log: Box<dyn LogBackend>,
    keyspaces: Vec<BTreeMap<Vec<u8>, Vec<u8>>>,
    frames: u64,
    options: StoreOptions,
    dir: Option<StoreDir>,
    poisoned: bool,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("frames", &self.frames)
            .field("live_entries", &self.live_entries())
            .field("dir", &self.dir.as_ref().map(StoreDir::path))
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl KvStore {
    /// Opens the file-backed store in directory `path`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be opened or locked, or if the log is
    /// corrupted. A torn trailing frame is not an error; it is cut off.
    pub fn open(path: &Path, options: StoreOptions) -> StorageResult<Self> {
        let dir = StoreDir::open(path, options.create_if_missing)?;
        let log = FileLog::open(&dir.log_path())?;
        let mut store = Self::with_backend(Box::new(log), options)?;
        store.dir = Some(dir);

        tracing::debug!(
            path = %path.display(),
            frames = store.frames,
            entries = store.live_entries(),
            "opened store"
        );
        Ok(store)
    }

    /// Creates an empty store that lives only in memory.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self {
            log: Box::new(MemoryLog::new()),
            keyspaces: vec![BTreeMap::new(); Keyspace::COUNT],
            frames: 0,
            options: StoreOptions::default(),
            dir: None,
            poisoned: false,
        }
    }

    /// Opens a store over an arbitrary log backend, replaying its contents.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read or is corrupted.
    pub fn with_backend(log: Box<dyn LogBackend>, options: StoreOptions) -> StorageResult<Self> {
        let mut store = Self {
            log,
            keyspaces: vec![BTreeMap::new(); Keyspace::COUNT],
            frames: 0,
            options,
            dir: None,
            poisoned: false,
        };
        store.replay()?;

        if store.should_compact() {
            store.compact()?;
        }
        Ok(store)
    }

    /// Removes the file-backed store at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the store is still open or the files cannot be removed.
    pub fn destroy(path: &Path) -> StorageResult<()> {
        StoreDir::destroy(path)?;
        tracing::debug!(path = %path.display(), "destroyed store");
        Ok(())
    }

    fn replay(&mut self) -> StorageResult<()> {
        let image = self.log.read_all()?;
        let mut reader = FrameReader::new(&image);

        for item in reader.by_ref() {
            let (_, frame) = item?;
            self.apply(frame);
            self.frames += 1;
        }

        if reader.torn() {
            let valid = reader.valid_len();
            tracing::warn!(
                valid_bytes = valid,
                log_bytes = image.len(),
                "discarding torn trailing frame"
            );
            self.log.truncate(valid)?;
        }
        Ok(())
    }

    fn apply(&mut self, frame: Frame) {
        let map = &mut self.keyspaces[frame.keyspace.index()];
        match frame.op {
            FrameOp::Put => {
                map.insert(frame.key, frame.value);
            }
            FrameOp::Delete => {
                map.remove(&frame.key);
            }
        }
    }

    fn write(&mut self, frame: Frame) -> StorageResult<()> {
        if self.poisoned {
            return Err(StorageError::Closed);
        }
        let bytes = frame.encode()?;
        let offset = self.log.size()?;
        if let Err(err) = self.append_frame(&bytes) {
            self.roll_back(offset, &err);
            return Err(err);
        }
        self.frames += 1;
        self.apply(frame);
        Ok(())
    }

    fn append_frame(&mut self, bytes: &[u8]) -> StorageResult<()> {
        self.log.append(bytes)?;
        if self.options.sync_on_write {
            self.log.sync()?;
        }
        Ok(())
    }

    /// Cuts a failed frame out of the log so later frames stay reachable.
    fn roll_back(&mut self, offset: u64, cause: &StorageError) {
        match self.log.truncate(offset) {
            Ok(()) => tracing::warn!(offset, error = %cause, "rolled back failed write"),
            Err(err) => {
                tracing::error!(
                    offset,
                    error = %err,
                    cause = %cause,
                    "could not roll back failed write; store rejects further writes"
                );
                self.poisoned = true;
            }
        }
    }

    fn should_compact(&self) -> bool {
        match self.options.compact_ratio {
            Some(ratio) if self.frames >= MIN_FRAMES_FOR_COMPACTION => {
                let live = self.live_entries().max(1) as u64;
                self.frames / live >= u64::from(ratio.max(1))
            }
            _ => false,
        }
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, keyspace: Keyspace, key: &[u8]) -> Option<&[u8]> {
        self.keyspaces[keyspace.index()]
            .get(key)
            .map(Vec::as_slice)
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Fails if the frame cannot be encoded or written. The previous value
    /// stays visible in that case.
    pub fn put(&mut self, keyspace: Keyspace, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.write(Frame::put(keyspace, key, value))
    }

    /// Removes `key`. Returns whether it was present.
    ///
    /// Deleting a missing key succeeds without touching the log.
    ///
    /// # Errors
    ///
    /// Fails if the delete frame cannot be written.
    pub fn delete(&mut self, keyspace: Keyspace, key: &[u8]) -> StorageResult<bool> {
        if !self.keyspaces[keyspace.index()].contains_key(key) {
            return Ok(false);
        }
        self.write(Frame::delete(keyspace, key))?;
        Ok(true)
    }

    /// Iterates over one keyspace in key order.
    pub fn iter(&self, keyspace: Keyspace) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.keyspaces[keyspace.index()]
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Iterates over every keyspace, in keyspace then key order.
    pub fn iter_all(&self) -> impl Iterator<Item = (Keyspace, &[u8], &[u8])> + '_ {
        Keyspace::all().flat_map(move |ks| self.iter(ks).map(move |(k, v)| (ks, k, v)))
    }

    /// Number of live entries in one keyspace.
    #[must_use]
    pub fn entry_count(&self, keyspace: Keyspace) -> usize {
        self.keyspaces[keyspace.index()].len()
    }

    fn live_entries(&self) -> usize {
        self.keyspaces.iter().map(BTreeMap::len).sum()
    }

    /// Returns current statistics.
    ///
    /// # Errors
    ///
    /// Fails if the log size cannot be read.
    pub fn stats(&self) -> StorageResult<StoreStats> {
        Ok(StoreStats {
            frames: self.frames,
            live_entries: self.live_entries(),
            log_bytes: self.log.size()?,
        })
    }

    /// Rewrites the log so it holds exactly one put frame per live entry.
    ///
    /// # Errors
    ///
    /// Fails if the new log cannot be written. The old log stays in place.
    pub fn compact(&mut self) -> StorageResult<()> {
        let mut image = Vec::new();
        let mut frames = 0u64;
        for (ks, key, value) in self.iter_all() {
            image.extend(Frame::put(ks, key, value).encode()?);
            frames += 1;
        }

        let before = self.frames;
        self.log.replace(&image)?;
        self.frames = frames;

        tracing::debug!(before, after = frames, "compacted store log");
        Ok(())
    }

    /// Forces every written frame to durable storage.
    ///
    /// # Errors
    ///
    /// Fails if the backend sync fails.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.log.sync()
    }
}
