//! The public mapping store handle.

use crate::category::{NotSyncedOperation, RecordAction, RecordCategory};
use crate::codec::RecordMetadata;
use crate::config::MapConfig;
use crate::error::{MapError, MapResult};
use crate::lane::{Lane, Pending};
use crate::observe::{MapObserver, TracingObserver};
use crate::session::{DumpEntry, StoreSession, StoreSummary};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Persistent bidirectional mapping between local record ids and remote
/// object ids.
///
/// Every operation is queued on a dedicated lane thread that owns the store
/// and runs work strictly in submission order. Operations return a
/// [`Pending`] right away; `.await` it, or call [`Pending::wait`] from
/// synchronous code.
///
/// Failures never surface as errors. Each operation resolves to its failure
/// value (`false`, `None`, `""` or an empty set) and the cause is handed to
/// the [`MapObserver`].
///
/// # Example
///
/// ```rust
/// use syncmap_core::{MapConfig, ObjectMap, RecordCategory};
///
/// let profile = tempfile::tempdir().unwrap();
/// let map = ObjectMap::new(MapConfig::new(profile.path())).unwrap();
/// assert!(map.set_api_version("0"));
///
/// let bookmark = RecordCategory::Bookmark;
/// assert!(map.save_object_id_and_order(bookmark, "12", "obj-12", "1.0.3").wait());
/// assert_eq!(map.get_local_id_by_object_id(bookmark, "obj-12").wait().as_deref(), Some("12"));
/// assert_eq!(map.get_order_by_local_id(bookmark, "12").wait(), "1.0.3");
///
/// map.shutdown().wait();
/// ```
pub struct ObjectMap {
    lane: Lane<StoreSession>,
    api_version: OnceLock<String>,
    observer: Arc<dyn MapObserver>,
    store_path: Option<PathBuf>,
}

impl std::fmt::Debug for ObjectMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectMap")
            .field("store_path", &self.store_path)
            .field("api_version", &self.api_version.get())
            .field("accepting", &self.lane.is_accepting())
            .finish()
    }
}

/// Turns an internal result into the public failure value, reporting errors.
fn settle<T: Default>(session: &StoreSession, operation: &'static str, result: MapResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            session.report(operation, &err);
            T::default()
        }
    }
}

impl ObjectMap {
    /// Starts a mapping store for the profile in `config`.
    ///
    /// The store itself is opened lazily by the first operation.
    ///
    /// # Errors
    ///
    /// Fails if the profile path is empty or the lane thread cannot start.
    pub fn new(config: MapConfig) -> MapResult<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Like [`ObjectMap::new`], reporting to `observer`.
    ///
    /// # Errors
    ///
    /// Fails if the profile path is empty or the lane thread cannot start.
    pub fn with_observer(config: MapConfig, observer: Arc<dyn MapObserver>) -> MapResult<Self> {
        if config.profile_path.as_os_str().is_empty() {
            return Err(MapError::contract("profile path is empty"));
        }
        let store_path = config.store_path();
        let session =
            StoreSession::on_disk(store_path.clone(), config.store_options(), observer.clone());
        Self::start(&config.lane_name, session, observer, Some(store_path))
    }

    /// Starts a mapping store that keeps everything in memory.
    ///
    /// Contents survive [`ObjectMap::close`] and are dropped by
    /// [`ObjectMap::destroy`] or when the map goes away.
    ///
    /// # Errors
    ///
    /// Fails if the lane thread cannot start.
    pub fn open_in_memory(observer: Arc<dyn MapObserver>) -> MapResult<Self> {
        let session = StoreSession::in_memory(observer.clone());
        Self::start(crate::config::DEFAULT_LANE_NAME, session, observer, None)
    }

    fn start(
        lane_name: &str,
        session: StoreSession,
        observer: Arc<dyn MapObserver>,
        store_path: Option<PathBuf>,
    ) -> MapResult<Self> {
        let lane = Lane::spawn(lane_name, session)?;
        Ok(Self {
            lane,
            api_version: OnceLock::new(),
            observer,
            store_path,
        })
    }

    /// Directory of the on-disk store, `None` for in-memory stores.
    #[must_use]
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Sets the protocol version stamped on saved records.
    ///
    /// Must be called exactly once, with a non-empty value, before the first
    /// save. Returns `false` and reports a contract violation otherwise.
    pub fn set_api_version(&self, api_version: impl Into<String>) -> bool {
        let api_version = api_version.into();
        let outcome = if api_version.is_empty() {
            Err(MapError::contract("api_version is empty"))
        } else {
            self.api_version
                .set(api_version)
                .map_err(|_| MapError::contract("api_version is already set"))
        };

        match outcome {
            Ok(()) => true,
            Err(err) => {
                self.observer.contract_violation("set_api_version", &err);
                false
            }
        }
    }

    /// The protocol version, once set.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.get().map(String::as_str)
    }

    fn current_api_version(&self) -> Option<String> {
        self.api_version.get().cloned()
    }

    /// Maps a local id to an object id, without an order.
    pub fn save_object_id(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Pending<bool> {
        let (local_id, object_id) = (local_id.into(), object_id.into());
        let api_version = self.current_api_version();
        self.lane.submit(move |session| {
            let result = session
                .save_mapping(category, &local_id, &object_id, None, api_version.as_deref())
                .map(|()| true);
            settle(session, "save_object_id", result)
        })
    }

    /// Maps a local id to an object id and records its order.
    pub fn save_object_id_and_order(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
        object_id: impl Into<String>,
        order: impl Into<String>,
    ) -> Pending<bool> {
        self.save_with_order("save_object_id_and_order", category, local_id, object_id, order)
    }

    /// Same as [`ObjectMap::save_object_id_and_order`].
    pub fn create_order_by_local_id(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
        object_id: impl Into<String>,
        order: impl Into<String>,
    ) -> Pending<bool> {
        self.save_with_order("create_order_by_local_id", category, local_id, object_id, order)
    }

    fn save_with_order(
        &self,
        operation: &'static str,
        category: RecordCategory,
        local_id: impl Into<String>,
        object_id: impl Into<String>,
        order: impl Into<String>,
    ) -> Pending<bool> {
        let (local_id, object_id, order) = (local_id.into(), object_id.into(), order.into());
        let api_version = self.current_api_version();
        self.lane.submit(move |session| {
            let result = session
                .save_mapping(
                    category,
                    &local_id,
                    &object_id,
                    Some(&order),
                    api_version.as_deref(),
                )
                .map(|()| true);
            settle(session, operation, result)
        })
    }

    /// Replaces the order of an existing mapping.
    ///
    /// Resolves to `false` if the local id has no mapping.
    pub fn update_order_by_local_id(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
        new_order: impl Into<String>,
    ) -> Pending<bool> {
        let (local_id, new_order) = (local_id.into(), new_order.into());
        let api_version = self.current_api_version();
        self.lane.submit(move |session| {
            let result =
                session.update_order(category, &local_id, &new_order, api_version.as_deref());
            settle(session, "update_order_by_local_id", result)
        })
    }

    /// Local id mapped to `object_id` within `category`.
    pub fn get_local_id_by_object_id(
        &self,
        category: RecordCategory,
        object_id: impl Into<String>,
    ) -> Pending<Option<String>> {
        let object_id = object_id.into();
        self.lane.submit(move |session| {
            let result = session.local_id_by_object_id(category, &object_id);
            settle(session, "get_local_id_by_object_id", result)
        })
    }

    /// Object id mapped to a local id.
    pub fn get_object_id_by_local_id(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
    ) -> Pending<Option<String>> {
        let local_id = local_id.into();
        self.lane.submit(move |session| {
            let result = session.object_id_by_local_id(category, &local_id);
            settle(session, "get_object_id_by_local_id", result)
        })
    }

    /// Full stored metadata of a local id.
    pub fn get_metadata_by_local_id(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
    ) -> Pending<Option<RecordMetadata>> {
        let local_id = local_id.into();
        self.lane.submit(move |session| {
            let result = session.metadata(category, &local_id);
            settle(session, "get_metadata_by_local_id", result)
        })
    }

    /// Order of the record mapped to `object_id`; empty on a miss.
    pub fn get_order_by_object_id(
        &self,
        category: RecordCategory,
        object_id: impl Into<String>,
    ) -> Pending<String> {
        let object_id = object_id.into();
        self.lane.submit(move |session| {
            let result = session.order_by_object_id(category, &object_id);
            settle(session, "get_order_by_object_id", result)
        })
    }

    /// Order of a local id; empty on a miss.
    pub fn get_order_by_local_id(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
    ) -> Pending<String> {
        let local_id = local_id.into();
        self.lane.submit(move |session| {
            let result = session.order_by_local_id(category, &local_id);
            settle(session, "get_order_by_local_id", result)
        })
    }

    /// Orders of several local ids, one per input in the same order.
    pub fn get_order_by_local_ids(
        &self,
        category: RecordCategory,
        local_ids: Vec<String>,
    ) -> Pending<Vec<String>> {
        self.lane
            .submit(move |session| session.orders_by_local_ids(category, &local_ids))
    }

    /// Removes a local id's mapping in both directions.
    ///
    /// Resolves to `false` only if the store could not delete.
    pub fn delete_by_local_id(
        &self,
        category: RecordCategory,
        local_id: impl Into<String>,
    ) -> Pending<bool> {
        let local_id = local_id.into();
        self.lane.submit(move |session| {
            let result = session.delete_mapping(category, &local_id).map(|()| true);
            settle(session, "delete_by_local_id", result)
        })
    }

    /// Stores opaque text under a bare key.
    pub fn save_special_json(
        &self,
        key: impl Into<String>,
        json: impl Into<String>,
    ) -> Pending<bool> {
        let (key, json) = (key.into(), json.into());
        self.lane.submit(move |session| {
            let result = session.save_special_json(&key, &json).map(|()| true);
            settle(session, "save_special_json", result)
        })
    }

    /// Text stored by [`ObjectMap::save_special_json`].
    pub fn get_special_json_by_local_id(&self, key: impl Into<String>) -> Pending<Option<String>> {
        let key = key.into();
        self.lane.submit(move |session| {
            let result = session.special_json(&key);
            settle(session, "get_special_json_by_local_id", result)
        })
    }

    /// Reads or updates the not-synced set of `category` and `action`.
    ///
    /// Resolves to the set after the operation, or to an empty set if it
    /// could not be persisted. With [`RecordAction::Delete`], ids removed
    /// from the set also lose their mappings.
    pub fn save_get_delete_not_synced_records(
        &self,
        category: RecordCategory,
        action: RecordAction,
        local_ids: BTreeSet<String>,
        operation: NotSyncedOperation,
    ) -> Pending<BTreeSet<String>> {
        self.lane.submit(move |session| {
            let result = session.apply_not_synced(category, action, &local_ids, operation);
            settle(session, "save_get_delete_not_synced_records", result)
        })
    }

    /// Deletes one raw key from the records namespace.
    pub fn reset_key(&self, key: impl Into<String>) -> Pending<bool> {
        let key = key.into();
        self.lane.submit(move |session| {
            let result = session.reset_key(&key);
            settle(session, "reset_key", result)
        })
    }

    /// Every raw entry of the store.
    pub fn dump(&self) -> Pending<Vec<DumpEntry>> {
        self.lane.submit(move |session| {
            let result = session.dump();
            settle(session, "dump", result)
        })
    }

    /// Size information; `None` if the store cannot be opened.
    pub fn summary(&self) -> Pending<Option<StoreSummary>> {
        self.lane.submit(move |session| {
            let result = session.summary().map(Some);
            settle(session, "summary", result)
        })
    }

    /// Releases the store handle after queued work. Does not block.
    ///
    /// The next operation reopens the store. An in-memory store keeps its
    /// contents.
    pub fn close(&self) {
        self.lane.post(StoreSession::close);
    }

    /// Closes the store and removes its files, or empties an in-memory store.
    pub fn destroy(&self) -> Pending<bool> {
        self.lane.submit(move |session| {
            let result = session.destroy().map(|()| true);
            settle(session, "destroy", result)
        })
    }

    /// Closes the store and stops the lane once queued work has run.
    ///
    /// Resolves to `true` after the handle is released. Anything submitted
    /// afterwards resolves to its failure value straight away.
    pub fn shutdown(&self) -> Pending<bool> {
        self.lane.finish(|session| {
            session.close();
            true
        })
    }

    /// Whether the lane still accepts work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lane.is_accepting()
    }
}

impl Drop for ObjectMap {
    fn drop(&mut self) {
        if self.lane.is_accepting() {
            drop(self.lane.finish(StoreSession::close));
        }
    }
}
