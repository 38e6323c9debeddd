//! Forward and reverse mapping operations.
//!
//! These run on the lane against the [`StoreSession`]. A forward entry maps
//! a category-tagged local id to its [`RecordMetadata`]; a reverse entry maps
//! the object id back to the forward key. Writes go forward first, so a
//! reverse entry never exists without the forward entry it points at.

use crate::category::RecordCategory;
use crate::codec::{compose_key, decode_metadata, decompose_key, encode_metadata, RecordMetadata};
use crate::error::{MapError, MapResult};
use crate::session::{Namespace, StoreSession};

fn require(value: &str, what: &str) -> MapResult<()> {
    if value.is_empty() {
        return Err(MapError::contract(format!("{what} is empty")));
    }
    Ok(())
}

impl StoreSession {
    /// Writes the forward entry, then the reverse entry.
    ///
    /// A reverse entry left behind by an earlier object id of the same
    /// record is removed afterwards.
    pub(crate) fn save_mapping(
        &mut self,
        category: RecordCategory,
        local_id: &str,
        object_id: &str,
        order: Option<&str>,
        api_version: Option<&str>,
    ) -> MapResult<()> {
        require(local_id, "local id")?;
        require(object_id, "object id")?;
        let api_version = api_version
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MapError::contract("api_version is not set"))?;

        let key = compose_key(category, local_id);
        let value = encode_metadata(object_id, order, api_version)?;
        let previous = self.metadata_by_key(&key).ok().flatten();

        self.put(Namespace::Records, &key, &value)?;
        self.put(Namespace::ObjectIds, object_id, &key)?;

        if let Some(stale) = previous.filter(|m| !m.object_id.is_empty() && m.object_id != object_id) {
            self.drop_reverse(&stale.object_id, &key)?;
        }
        tracing::debug!(%category, local_id, object_id, "saved mapping");
        Ok(())
    }

    /// Re-saves an existing mapping with a new order.
    ///
    /// Returns `false` when there is no mapping to update.
    pub(crate) fn update_order(
        &mut self,
        category: RecordCategory,
        local_id: &str,
        new_order: &str,
        api_version: Option<&str>,
    ) -> MapResult<bool> {
        require(local_id, "local id")?;
        let Some(meta) = self.metadata(category, local_id)? else {
            return Ok(false);
        };
        if meta.object_id.is_empty() {
            return Ok(false);
        }
        self.save_mapping(category, local_id, &meta.object_id, Some(new_order), api_version)?;
        Ok(true)
    }

    fn metadata_by_key(&mut self, key: &str) -> MapResult<Option<RecordMetadata>> {
        match self.get(Namespace::Records, key)? {
            Some(text) => decode_metadata(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Decoded metadata of a local id.
    pub(crate) fn metadata(
        &mut self,
        category: RecordCategory,
        local_id: &str,
    ) -> MapResult<Option<RecordMetadata>> {
        self.metadata_by_key(&compose_key(category, local_id))
    }

    /// Resolves an object id to a local id of `category`.
    ///
    /// The reverse entry must point at a forward entry of the same category
    /// that still carries this object id; anything else is a miss.
    pub(crate) fn local_id_by_object_id(
        &mut self,
        category: RecordCategory,
        object_id: &str,
    ) -> MapResult<Option<String>> {
        const OP: &str = "get_local_id_by_object_id";
        require(object_id, "object id")?;

        let Some(raw_key) = self.get(Namespace::ObjectIds, object_id)? else {
            return Ok(None);
        };
        let (local_id, read_category) = decompose_key(&raw_key);
        if read_category != category {
            self.observer().inconsistency(
                OP,
                &format!("{object_id} maps to {read_category} record {local_id:?}, not {category}"),
            );
            return Ok(None);
        }

        match self.metadata_by_key(&raw_key)? {
            Some(meta) if meta.object_id == object_id => Ok(Some(local_id)),
            Some(meta) => {
                self.observer().inconsistency(
                    OP,
                    &format!("{raw_key:?} now maps to {:?}, not {object_id:?}", meta.object_id),
                );
                Ok(None)
            }
            None => {
                self.observer()
                    .inconsistency(OP, &format!("{object_id:?} points at missing {raw_key:?}"));
                Ok(None)
            }
        }
    }

    pub(crate) fn object_id_by_local_id(
        &mut self,
        category: RecordCategory,
        local_id: &str,
    ) -> MapResult<Option<String>> {
        require(local_id, "local id")?;
        Ok(self
            .metadata(category, local_id)?
            .map(|meta| meta.object_id)
            .filter(|id| !id.is_empty()))
    }

    pub(crate) fn order_by_local_id(
        &mut self,
        category: RecordCategory,
        local_id: &str,
    ) -> MapResult<String> {
        require(local_id, "local id")?;
        Ok(self
            .metadata(category, local_id)?
            .and_then(|meta| meta.order)
            .unwrap_or_default())
    }

    pub(crate) fn order_by_object_id(
        &mut self,
        category: RecordCategory,
        object_id: &str,
    ) -> MapResult<String> {
        match self.local_id_by_object_id(category, object_id)? {
            Some(local_id) => self.order_by_local_id(category, &local_id),
            None => Ok(String::new()),
        }
    }

    /// Orders of several local ids, in input order. Failures yield `""`.
    pub(crate) fn orders_by_local_ids(
        &mut self,
        category: RecordCategory,
        local_ids: &[String],
    ) -> Vec<String> {
        let mut orders = Vec::with_capacity(local_ids.len());
        for local_id in local_ids {
            match self.order_by_local_id(category, local_id) {
                Ok(order) => orders.push(order),
                Err(err) => {
                    self.report("get_order_by_local_ids", &err);
                    orders.push(String::new());
                }
            }
        }
        orders
    }

    /// Removes the forward entry and, when known, its reverse entry.
    ///
    /// An unreadable forward entry is still deleted.
    pub(crate) fn delete_mapping(&mut self, category: RecordCategory, local_id: &str) -> MapResult<()> {
        require(local_id, "local id")?;
        let key = compose_key(category, local_id);

        let object_id = match self.metadata_by_key(&key) {
            Ok(meta) => meta.map(|m| m.object_id).filter(|id| !id.is_empty()),
            Err(err) => {
                self.report("delete_by_local_id", &err);
                None
            }
        };

        self.delete(Namespace::Records, &key)?;
        if let Some(object_id) = object_id {
            self.drop_reverse(&object_id, &key)?;
        }
        tracing::debug!(%category, local_id, "deleted mapping");
        Ok(())
    }

    /// Deletes the reverse entry of `object_id` if it still points at `key`.
    fn drop_reverse(&mut self, object_id: &str, key: &str) -> MapResult<()> {
        if self.get(Namespace::ObjectIds, object_id)?.as_deref() == Some(key) {
            self.delete(Namespace::ObjectIds, object_id)?;
        }
        Ok(())
    }

    /// Stores opaque text under a bare key.
    pub(crate) fn save_special_json(&mut self, key: &str, json: &str) -> MapResult<()> {
        require(key, "special key")?;
        self.put(Namespace::Records, key, json)
    }

    pub(crate) fn special_json(&mut self, key: &str) -> MapResult<Option<String>> {
        require(key, "special key")?;
        self.get(Namespace::Records, key)
    }

    /// Sends an error to the observer under the right callback.
    pub(crate) fn report(&self, operation: &'static str, error: &MapError) {
        if error.is_contract_violation() {
            self.observer().contract_violation(operation, error);
        } else {
            self.observer().operation_failed(operation, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::testing::RecordingObserver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use syncmap_storage::{KvStore, LogBackend, MemoryLog, StorageError, StorageResult, StoreOptions};

    const V1: Option<&str> = Some("v1");

    fn session() -> (StoreSession, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (StoreSession::in_memory(observer.clone()), observer)
    }

    /// Memory log that refuses appends once its budget is spent.
    struct BudgetLog {
        inner: MemoryLog,
        budget: Arc<AtomicUsize>,
    }

    impl LogBackend for BudgetLog {
        fn read_all(&self) -> StorageResult<Vec<u8>> {
            self.inner.read_all()
        }
        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            if self.budget.load(Ordering::SeqCst) == 0 {
                return Err(StorageError::Closed);
            }
            self.budget.fetch_sub(1, Ordering::SeqCst);
            self.inner.append(data)
        }
        fn sync(&mut self) -> StorageResult<()> {
            Ok(())
        }
        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }
        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.inner.truncate(new_size)
        }
        fn replace(&mut self, contents: &[u8]) -> StorageResult<()> {
            self.inner.replace(contents)
        }
    }

    fn budget_session(budget: usize) -> (StoreSession, Arc<AtomicUsize>) {
        let budget = Arc::new(AtomicUsize::new(budget));
        let log = BudgetLog {
            inner: MemoryLog::new(),
            budget: Arc::clone(&budget),
        };
        let store = KvStore::with_backend(Box::new(log), StoreOptions::default()).unwrap();
        let observer = Arc::new(RecordingObserver::default());
        (StoreSession::from_store(store, observer), budget)
    }

    #[test]
    fn save_writes_both_directions() {
        let (mut s, _) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", Some("1.0.1"), V1)
            .unwrap();

        assert_eq!(
            s.get(Namespace::ObjectIds, "obj-1").unwrap().as_deref(),
            Some("b1")
        );
        assert_eq!(
            s.object_id_by_local_id(RecordCategory::Bookmark, "1").unwrap().as_deref(),
            Some("obj-1")
        );
        assert_eq!(
            s.local_id_by_object_id(RecordCategory::Bookmark, "obj-1").unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(s.order_by_local_id(RecordCategory::Bookmark, "1").unwrap(), "1.0.1");
        assert_eq!(s.order_by_object_id(RecordCategory::Bookmark, "obj-1").unwrap(), "1.0.1");
    }

    #[test]
    fn save_without_order_reads_empty_order() {
        let (mut s, _) = session();
        s.save_mapping(RecordCategory::History, "7", "obj-7", None, V1).unwrap();
        assert_eq!(s.order_by_local_id(RecordCategory::History, "7").unwrap(), "");
        assert_eq!(
            s.metadata(RecordCategory::History, "7").unwrap().unwrap().api_version.as_deref(),
            Some("v1")
        );
    }

    #[test]
    fn contract_violations_write_nothing() {
        let (mut s, _) = session();
        assert!(s
            .save_mapping(RecordCategory::Bookmark, "1", "obj", None, None)
            .unwrap_err()
            .is_contract_violation());
        assert!(s
            .save_mapping(RecordCategory::Bookmark, "", "obj", None, V1)
            .unwrap_err()
            .is_contract_violation());
        assert!(s
            .save_mapping(RecordCategory::Bookmark, "1", "", None, V1)
            .unwrap_err()
            .is_contract_violation());
        assert!(s
            .local_id_by_object_id(RecordCategory::Bookmark, "")
            .unwrap_err()
            .is_contract_violation());
        assert!(s.dump().unwrap().is_empty());
    }

    #[test]
    fn update_order_changes_only_order() {
        let (mut s, _) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", Some("1.0.1"), V1)
            .unwrap();

        assert!(s.update_order(RecordCategory::Bookmark, "1", "1.0.5", V1).unwrap());
        let meta = s.metadata(RecordCategory::Bookmark, "1").unwrap().unwrap();
        assert_eq!(meta.object_id, "obj-1");
        assert_eq!(meta.order.as_deref(), Some("1.0.5"));
        assert_eq!(
            s.local_id_by_object_id(RecordCategory::Bookmark, "obj-1").unwrap().as_deref(),
            Some("1")
        );

        assert!(!s.update_order(RecordCategory::Bookmark, "2", "1.0.6", V1).unwrap());
        assert!(s.metadata(RecordCategory::Bookmark, "2").unwrap().is_none());
    }

    #[test]
    fn categories_do_not_collide() {
        let (mut s, _) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "obj-b", None, V1).unwrap();
        s.save_mapping(RecordCategory::History, "1", "obj-h", None, V1).unwrap();

        assert_eq!(
            s.object_id_by_local_id(RecordCategory::Bookmark, "1").unwrap().as_deref(),
            Some("obj-b")
        );
        assert_eq!(
            s.object_id_by_local_id(RecordCategory::History, "1").unwrap().as_deref(),
            Some("obj-h")
        );
    }

    #[test]
    fn reverse_lookup_checks_category() {
        let (mut s, observer) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", None, V1).unwrap();

        assert_eq!(s.local_id_by_object_id(RecordCategory::History, "obj-1").unwrap(), None);
        assert_eq!(observer.count("inconsistent"), 1);
    }

    #[test]
    fn object_id_that_looks_like_a_key_does_not_collide() {
        let (mut s, _) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", None, V1).unwrap();
        s.save_mapping(RecordCategory::Bookmark, "2", "b1", None, V1).unwrap();

        assert_eq!(
            s.object_id_by_local_id(RecordCategory::Bookmark, "1").unwrap().as_deref(),
            Some("obj-1")
        );
        assert_eq!(
            s.local_id_by_object_id(RecordCategory::Bookmark, "b1").unwrap().as_deref(),
            Some("2")
        );
    }

    #[test]
    fn resave_with_new_object_id_drops_stale_reverse() {
        let (mut s, _) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "old", None, V1).unwrap();
        s.save_mapping(RecordCategory::Bookmark, "1", "new", None, V1).unwrap();

        assert_eq!(s.get(Namespace::ObjectIds, "old").unwrap(), None);
        assert_eq!(s.local_id_by_object_id(RecordCategory::Bookmark, "old").unwrap(), None);
        assert_eq!(
            s.local_id_by_object_id(RecordCategory::Bookmark, "new").unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn dangling_reverse_is_a_miss() {
        let (mut s, observer) = session();
        s.put(Namespace::ObjectIds, "obj-9", "b9").unwrap();

        assert_eq!(s.local_id_by_object_id(RecordCategory::Bookmark, "obj-9").unwrap(), None);
        assert_eq!(s.order_by_object_id(RecordCategory::Bookmark, "obj-9").unwrap(), "");
        assert_eq!(observer.count("inconsistent"), 2);
    }

    #[test]
    fn delete_removes_both_directions() {
        let (mut s, _) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", Some("1"), V1).unwrap();

        s.delete_mapping(RecordCategory::Bookmark, "1").unwrap();
        assert_eq!(s.object_id_by_local_id(RecordCategory::Bookmark, "1").unwrap(), None);
        assert_eq!(s.local_id_by_object_id(RecordCategory::Bookmark, "obj-1").unwrap(), None);
        assert!(s.dump().unwrap().is_empty());

        // Nothing to delete is still a success.
        s.delete_mapping(RecordCategory::Bookmark, "1").unwrap();
    }

    #[test]
    fn delete_tolerates_undecodable_forward_entry() {
        let (mut s, observer) = session();
        s.put(Namespace::Records, "b3", "garbage").unwrap();

        s.delete_mapping(RecordCategory::Bookmark, "3").unwrap();
        assert_eq!(s.get(Namespace::Records, "b3").unwrap(), None);
        assert_eq!(observer.count("failed delete_by_local_id"), 1);
    }

    #[test]
    fn undecodable_forward_entry_is_an_error() {
        let (mut s, _) = session();
        s.put(Namespace::Records, "b3", "[{\"order\":\"1\"}]").unwrap();
        assert!(matches!(
            s.object_id_by_local_id(RecordCategory::Bookmark, "3"),
            Err(MapError::Decode { .. })
        ));
    }

    #[test]
    fn batch_orders_keep_input_order() {
        let (mut s, observer) = session();
        s.save_mapping(RecordCategory::Bookmark, "1", "o1", Some("a"), V1).unwrap();
        s.save_mapping(RecordCategory::Bookmark, "3", "o3", Some("c"), V1).unwrap();
        s.put(Namespace::Records, "b4", "garbage").unwrap();

        let ids: Vec<String> = ["3", "2", "1", "4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            s.orders_by_local_ids(RecordCategory::Bookmark, &ids),
            vec!["c", "", "a", ""]
        );
        assert_eq!(observer.count("failed get_order_by_local_ids"), 1);
    }

    #[test]
    fn special_json_is_stored_bare() {
        let (mut s, _) = session();
        s.save_special_json("deviceId", "{\"id\":3}").unwrap();
        assert_eq!(s.special_json("deviceId").unwrap().as_deref(), Some("{\"id\":3}"));
        assert_eq!(s.special_json("missing").unwrap(), None);
        assert_eq!(s.dump().unwrap().len(), 1);
    }

    #[test]
    fn failed_forward_write_skips_reverse() {
        let (mut s, _) = budget_session(0);
        assert!(matches!(
            s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", None, V1),
            Err(MapError::StoreIo(_))
        ));
        assert!(s.dump().unwrap().is_empty());
    }

    #[test]
    fn failed_reverse_write_keeps_forward() {
        let (mut s, _) = budget_session(1);
        assert!(matches!(
            s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", None, V1),
            Err(MapError::StoreIo(_))
        ));
        assert_eq!(
            s.object_id_by_local_id(RecordCategory::Bookmark, "1").unwrap().as_deref(),
            Some("obj-1")
        );
        assert_eq!(s.get(Namespace::ObjectIds, "obj-1").unwrap(), None);
    }

    #[test]
    fn failed_delete_keeps_mapping() {
        let (mut s, budget) = budget_session(2);
        s.save_mapping(RecordCategory::Bookmark, "1", "obj-1", None, V1).unwrap();
        assert_eq!(budget.load(Ordering::SeqCst), 0);

        assert!(s.delete_mapping(RecordCategory::Bookmark, "1").is_err());
        assert_eq!(
            s.object_id_by_local_id(RecordCategory::Bookmark, "1").unwrap().as_deref(),
            Some("obj-1")
        );
    }
}
