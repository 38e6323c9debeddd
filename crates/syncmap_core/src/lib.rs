//! # SyncMap Core
//!
//! A persistent, bidirectional mapping between locally generated record ids
//! (bookmarks, history items) and the object ids a remote sync protocol
//! assigns to them, plus per-record ordering metadata and a per-category
//! queue of records not yet synced.
//!
//! ## Layout
//!
//! - [`ObjectMap`] - the public handle; every call is queued on one lane
//!   thread and returns a [`Pending`] result
//! - [`RecordCategory`], [`RecordAction`], [`NotSyncedOperation`] - what a
//!   record is and what is pending for it
//! - [`codec`] - raw key and value formats
//! - [`MapObserver`] - where failures and inconsistencies are reported
//!
//! ## Storage
//!
//! One store per profile, in `<profile>/sync_object_map`. Forward entries
//! (`b42` → metadata), not-synced sets and special JSON share the records
//! namespace; reverse entries (object id → `b42`) live in a separate
//! namespace so a remote id can never shadow a local key.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod category;
pub mod codec;
mod config;
mod error;
mod lane;
mod map;
mod mapping;
mod observe;
mod queue;
mod session;

pub use category::{NotSyncedOperation, RecordAction, RecordCategory};
pub use codec::RecordMetadata;
pub use config::{store_path, MapConfig, DB_DIR_NAME, DEFAULT_LANE_NAME};
pub use error::{MapError, MapResult};
pub use lane::Pending;
pub use map::ObjectMap;
pub use observe::{MapObserver, TracingObserver};
pub use queue::not_synced_key;
pub use session::{DumpEntry, Namespace, StoreSummary};
