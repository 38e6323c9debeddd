//! # SyncMap Storage
//!
//! The embedded ordered key-value engine underneath the SyncMap record
//! mapping store.
//!
//! The engine is deliberately small: byte-string keys and values, a handful
//! of natively separated [`Keyspace`]s, `get` / `put` / `delete`, ordered
//! iteration, and `destroy`. Every mutation is one CRC-checked frame in an
//! append-only log, so single-key updates are atomic and durable; there are
//! no multi-key transactions.
//!
//! ## Layers
//!
//! - [`LogBackend`] - where the log bytes live ([`FileLog`], [`MemoryLog`])
//! - [`Frame`] / [`FrameReader`] - the on-disk frame format and recovery
//! - [`StoreDir`] - directory layout and the single-handle lock
//! - [`KvStore`] - the ordered store rebuilt from the log on open
//!
//! ## Example
//!
//! ```rust
//! use syncmap_storage::{KvStore, Keyspace, StoreOptions};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("store");
//!
//! {
//!     let mut store = KvStore::open(&path, StoreOptions::default()).unwrap();
//!     store.put(Keyspace::DEFAULT, b"key", b"value").unwrap();
//! }
//!
//! let store = KvStore::open(&path, StoreOptions::default()).unwrap();
//! assert_eq!(store.get(Keyspace::DEFAULT, b"key"), Some(&b"value"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod dir;
mod error;
mod file;
mod frame;
mod keyspace;
mod memory;
mod store;

pub use backend::LogBackend;
pub use dir::StoreDir;
pub use error::{StorageError, StorageResult};
pub use file::FileLog;
pub use frame::{Frame, FrameOp, FrameReader, FRAME_MAGIC, FRAME_VERSION};
pub use keyspace::Keyspace;
pub use memory::MemoryLog;
pub use store::{KvStore, StoreOptions, StoreStats};
