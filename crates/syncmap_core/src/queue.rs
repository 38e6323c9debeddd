//! The not-synced change queue.
//!
//! For each record category and pending action there is one persisted set
//! of local ids, stored under `<record type name><action code>`, for
//! example `BOOKMARKS0` for bookmarks waiting to be created remotely.

use crate::category::{NotSyncedOperation, RecordAction, RecordCategory};
use crate::codec::{decode_set, encode_set};
use crate::error::{MapError, MapResult};
use crate::session::{Namespace, StoreSession};
use std::collections::BTreeSet;

/// Store key of a not-synced set.
///
/// # Errors
///
/// Returns a contract violation for [`RecordCategory::Unset`].
pub fn not_synced_key(category: RecordCategory, action: RecordAction) -> MapResult<String> {
    let type_name = category.record_type_name().ok_or_else(|| {
        MapError::contract(format!("{category} records have no not-synced queue"))
    })?;
    Ok(format!("{type_name}{}", action.code()))
}

impl StoreSession {
    /// Reads, updates and rewrites one not-synced set.
    ///
    /// Removing ids from the final-delete set also drops their mappings.
    /// A failed drop is reported and skipped; the set is still rewritten.
    pub(crate) fn apply_not_synced(
        &mut self,
        category: RecordCategory,
        action: RecordAction,
        local_ids: &BTreeSet<String>,
        operation: NotSyncedOperation,
    ) -> MapResult<BTreeSet<String>> {
        let key = not_synced_key(category, action)?;
        let mut set = self
            .get(Namespace::Records, &key)?
            .map(|text| decode_set(&text))
            .unwrap_or_default();

        match operation {
            NotSyncedOperation::Get => return Ok(set),
            NotSyncedOperation::Add => set.extend(local_ids.iter().cloned()),
            NotSyncedOperation::Delete => {
                for local_id in local_ids {
                    if set.remove(local_id) && action.is_final_delete() {
                        if let Err(err) = self.delete_mapping(category, local_id) {
                            self.observer().cleanup_failed(local_id, &err);
                        }
                    }
                }
            }
        }

        self.put(Namespace::Records, &key, &encode_set(&set)?)?;
        tracing::debug!(%key, %operation, size = set.len(), "updated not-synced set");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::testing::RecordingObserver;
    use std::sync::Arc;

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn session() -> (StoreSession, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (StoreSession::in_memory(observer.clone()), observer)
    }

    #[test]
    fn keys() {
        assert_eq!(
            not_synced_key(RecordCategory::Bookmark, RecordAction::Create).unwrap(),
            "BOOKMARKS0"
        );
        assert_eq!(
            not_synced_key(RecordCategory::History, RecordAction::Delete).unwrap(),
            "HISTORY_SITES2"
        );
        assert!(not_synced_key(RecordCategory::Unset, RecordAction::Update)
            .unwrap_err()
            .is_contract_violation());
    }

    #[test]
    fn get_on_fresh_store_is_empty() {
        let (mut s, _) = session();
        let set = s
            .apply_not_synced(
                RecordCategory::Bookmark,
                RecordAction::Create,
                &ids(&["ignored"]),
                NotSyncedOperation::Get,
            )
            .unwrap();
        assert!(set.is_empty());
        assert!(s.dump().unwrap().is_empty());
    }

    #[test]
    fn add_is_union_and_delete_is_difference() {
        let (mut s, _) = session();
        let bm = RecordCategory::Bookmark;
        let create = RecordAction::Create;

        s.apply_not_synced(bm, create, &ids(&["1", "2"]), NotSyncedOperation::Add)
            .unwrap();
        let set = s
            .apply_not_synced(bm, create, &ids(&["2", "3"]), NotSyncedOperation::Add)
            .unwrap();
        assert_eq!(set, ids(&["1", "2", "3"]));

        let set = s
            .apply_not_synced(bm, create, &ids(&["1", "9"]), NotSyncedOperation::Delete)
            .unwrap();
        assert_eq!(set, ids(&["2", "3"]));

        let set = s
            .apply_not_synced(bm, create, &BTreeSet::new(), NotSyncedOperation::Get)
            .unwrap();
        assert_eq!(set, ids(&["2", "3"]));
        assert_eq!(
            s.get(Namespace::Records, "BOOKMARKS0").unwrap().as_deref(),
            Some(r#"["2","3"]"#)
        );
    }

    #[test]
    fn sets_are_per_category_and_action() {
        let (mut s, _) = session();
        s.apply_not_synced(
            RecordCategory::Bookmark,
            RecordAction::Update,
            &ids(&["1"]),
            NotSyncedOperation::Add,
        )
        .unwrap();

        for (category, action) in [
            (RecordCategory::Bookmark, RecordAction::Create),
            (RecordCategory::History, RecordAction::Update),
        ] {
            let set = s
                .apply_not_synced(category, action, &BTreeSet::new(), NotSyncedOperation::Get)
                .unwrap();
            assert!(set.is_empty());
        }
    }

    #[test]
    fn final_delete_drops_mappings() {
        let (mut s, _) = session();
        let bm = RecordCategory::Bookmark;
        s.save_mapping(bm, "1", "obj-1", None, Some("v1")).unwrap();
        s.save_mapping(bm, "2", "obj-2", None, Some("v1")).unwrap();

        s.apply_not_synced(bm, RecordAction::Delete, &ids(&["1", "2"]), NotSyncedOperation::Add)
            .unwrap();
        let set = s
            .apply_not_synced(bm, RecordAction::Delete, &ids(&["1"]), NotSyncedOperation::Delete)
            .unwrap();

        assert_eq!(set, ids(&["2"]));
        assert_eq!(s.object_id_by_local_id(bm, "1").unwrap(), None);
        assert_eq!(s.local_id_by_object_id(bm, "obj-1").unwrap(), None);
        assert_eq!(s.object_id_by_local_id(bm, "2").unwrap().as_deref(), Some("obj-2"));
    }

    #[test]
    fn other_actions_keep_mappings() {
        let (mut s, _) = session();
        let bm = RecordCategory::Bookmark;
        s.save_mapping(bm, "1", "obj-1", None, Some("v1")).unwrap();

        s.apply_not_synced(bm, RecordAction::Update, &ids(&["1"]), NotSyncedOperation::Add)
            .unwrap();
        s.apply_not_synced(bm, RecordAction::Update, &ids(&["1"]), NotSyncedOperation::Delete)
            .unwrap();
        assert_eq!(s.object_id_by_local_id(bm, "1").unwrap().as_deref(), Some("obj-1"));
    }

    #[test]
    fn ids_not_in_set_are_not_dropped() {
        let (mut s, _) = session();
        let bm = RecordCategory::Bookmark;
        s.save_mapping(bm, "1", "obj-1", None, Some("v1")).unwrap();

        s.apply_not_synced(bm, RecordAction::Delete, &ids(&["1"]), NotSyncedOperation::Delete)
            .unwrap();
        assert_eq!(s.object_id_by_local_id(bm, "1").unwrap().as_deref(), Some("obj-1"));
    }

    #[test]
    fn undecodable_set_reads_as_empty() {
        let (mut s, _) = session();
        s.put(Namespace::Records, "HISTORY_SITES1", "{broken").unwrap();
        let set = s
            .apply_not_synced(
                RecordCategory::History,
                RecordAction::Update,
                &ids(&["5"]),
                NotSyncedOperation::Add,
            )
            .unwrap();
        assert_eq!(set, ids(&["5"]));
    }

    #[test]
    fn unset_category_is_rejected() {
        let (mut s, _) = session();
        let err = s
            .apply_not_synced(
                RecordCategory::Unset,
                RecordAction::Create,
                &ids(&["1"]),
                NotSyncedOperation::Add,
            )
            .unwrap_err();
        assert!(err.is_contract_violation());
    }
}
