//! Store session: lazy open, close, destroy and raw access.

use crate::error::{MapError, MapResult};
use crate::observe::MapObserver;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use syncmap_storage::{Keyspace, KvStore, StoreOptions};

/// The two key namespaces of the mapping store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Forward entries, not-synced sets and special JSON.
    Records,
    /// Reverse entries keyed by remote object id.
    ObjectIds,
}

impl Namespace {
    pub(crate) const fn keyspace(self) -> Keyspace {
        match self {
            Self::Records => Keyspace::DEFAULT,
            Self::ObjectIds => Keyspace::INDEX,
        }
    }

    /// Short name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Records => "records",
            Self::ObjectIds => "object_ids",
        }
    }
}

/// One raw entry of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpEntry {
    /// Namespace the entry lives in.
    pub namespace: Namespace,
    /// Raw key.
    pub key: String,
    /// Raw value.
    pub value: String,
}

/// Size information about the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreSummary {
    /// Log size in bytes.
    pub log_bytes: u64,
    /// Frames in the log.
    pub frames: u64,
    /// Live entries in the records namespace.
    pub records: usize,
    /// Live entries in the object id namespace.
    pub object_ids: usize,
}

enum Backing {
    Disk {
        path: PathBuf,
        options: StoreOptions,
    },
    /// Holds the engine while the session is closed, so contents live until
    /// destroy.
    Memory { parked: Option<KvStore> },
}

/// Owns the engine handle.
///
/// A session lives on the serialized lane and is only ever reached through
/// `&mut` from a lane job.
pub(crate) struct StoreSession {
    backing: Backing,
    store: Option<KvStore>,
    observer: Arc<dyn MapObserver>,
}

impl StoreSession {
    pub(crate) fn on_disk(
        path: PathBuf,
        options: StoreOptions,
        observer: Arc<dyn MapObserver>,
    ) -> Self {
        Self {
            backing: Backing::Disk { path, options },
            store: None,
            observer,
        }
    }

    pub(crate) fn in_memory(observer: Arc<dyn MapObserver>) -> Self {
        Self {
            backing: Backing::Memory { parked: None },
            store: None,
            observer,
        }
    }

    /// Wraps an already open store.
    #[cfg(test)]
    pub(crate) fn from_store(store: KvStore, observer: Arc<dyn MapObserver>) -> Self {
        Self {
            backing: Backing::Memory { parked: None },
            store: Some(store),
            observer,
        }
    }

    pub(crate) fn observer(&self) -> &dyn MapObserver {
        self.observer.as_ref()
    }

    fn path(&self) -> Option<&std::path::Path> {
        match &self.backing {
            Backing::Disk { path, .. } => Some(path),
            Backing::Memory { .. } => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.store.is_some()
    }

    /// Opens the store if it is not open yet.
    pub(crate) fn ensure_open(&mut self) -> MapResult<&mut KvStore> {
        if self.store.is_none() {
            let store = match &mut self.backing {
                Backing::Disk { path, options } => {
                    KvStore::open(path, options.clone()).map_err(MapError::StoreOpen)?
                }
                Backing::Memory { parked } => {
                    parked.take().unwrap_or_else(KvStore::open_in_memory)
                }
            };
            let entries = store.entry_count(Keyspace::DEFAULT) + store.entry_count(Keyspace::INDEX);
            self.observer.store_opened(self.path(), entries);
            self.store = Some(store);
        }

        match self.store.as_mut() {
            Some(store) => Ok(store),
            None => Err(MapError::LaneClosed),
        }
    }

    /// Releases the handle. An in-memory store is parked and comes back on
    /// the next open.
    pub(crate) fn close(&mut self) {
        if let Some(store) = self.store.take() {
            if let Backing::Memory { parked } = &mut self.backing {
                *parked = Some(store);
            }
            self.observer.store_closed();
        }
    }

    /// Closes the handle and removes the store files.
    pub(crate) fn destroy(&mut self) -> MapResult<()> {
        self.close();
        match &mut self.backing {
            Backing::Disk { path, .. } => KvStore::destroy(path)?,
            Backing::Memory { parked } => *parked = None,
        }
        self.observer.store_destroyed(self.path());
        Ok(())
    }

    pub(crate) fn get(&mut self, namespace: Namespace, key: &str) -> MapResult<Option<String>> {
        let store = self.ensure_open()?;
        match store.get(namespace.keyspace(), key.as_bytes()) {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| MapError::decode(format!("value of {key:?} is not UTF-8"))),
            None => Ok(None),
        }
    }

    pub(crate) fn put(&mut self, namespace: Namespace, key: &str, value: &str) -> MapResult<()> {
        let store = self.ensure_open()?;
        store.put(namespace.keyspace(), key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    /// Deletes a key; absent keys are not an error.
    pub(crate) fn delete(&mut self, namespace: Namespace, key: &str) -> MapResult<bool> {
        let store = self.ensure_open()?;
        Ok(store.delete(namespace.keyspace(), key.as_bytes())?)
    }

    /// Deletes one raw key from the records namespace.
    pub(crate) fn reset_key(&mut self, key: &str) -> MapResult<bool> {
        if key.is_empty() {
            return Err(MapError::contract("reset key is empty"));
        }
        self.delete(Namespace::Records, key)
    }

    /// Every entry of both namespaces, in namespace then key order.
    pub(crate) fn dump(&mut self) -> MapResult<Vec<DumpEntry>> {
        let store = self.ensure_open()?;
        let mut entries = Vec::new();
        for namespace in [Namespace::Records, Namespace::ObjectIds] {
            for (key, value) in store.iter(namespace.keyspace()) {
                entries.push(DumpEntry {
                    namespace,
                    key: String::from_utf8_lossy(key).into_owned(),
                    value: String::from_utf8_lossy(value).into_owned(),
                });
            }
        }
        Ok(entries)
    }

    pub(crate) fn summary(&mut self) -> MapResult<StoreSummary> {
        let store = self.ensure_open()?;
        let stats = store.stats()?;
        Ok(StoreSummary {
            log_bytes: stats.log_bytes,
            frames: stats.frames,
            records: store.entry_count(Namespace::Records.keyspace()),
            object_ids: store.entry_count(Namespace::ObjectIds.keyspace()),
        })
    }
}
