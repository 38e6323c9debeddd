//! CLI command implementations.

pub mod destroy;
pub mod dump;
pub mod inspect;
pub mod lookup;
pub mod pending;
pub mod reset_key;

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use syncmap_core::{store_path, MapConfig, MapError, MapObserver, ObjectMap, TracingObserver};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Forwards to tracing and remembers the first failure.
#[derive(Default)]
struct FailureLatch {
    first: Mutex<Option<String>>,
}

impl FailureLatch {
    fn record(&self, operation: &str, error: &MapError) {
        let mut first = self.first.lock();
        if first.is_none() {
            *first = Some(format!("{operation} failed: {error}"));
        }
    }
}

impl MapObserver for FailureLatch {
    fn operation_failed(&self, operation: &'static str, error: &MapError) {
        TracingObserver.operation_failed(operation, error);
        self.record(operation, error);
    }

    fn contract_violation(&self, operation: &'static str, error: &MapError) {
        TracingObserver.contract_violation(operation, error);
        self.record(operation, error);
    }

    fn inconsistency(&self, operation: &'static str, detail: &str) {
        TracingObserver.inconsistency(operation, detail);
    }

    fn cleanup_failed(&self, local_id: &str, error: &MapError) {
        TracingObserver.cleanup_failed(local_id, error);
    }
}

/// An open mapping store whose failures surface as command errors.
pub(crate) struct Store {
    map: ObjectMap,
    latch: Arc<FailureLatch>,
}

impl Store {
    /// Opens the store of an existing profile.
    ///
    /// Compaction on open is disabled so looking at a store never rewrites
    /// its log.
    pub(crate) fn open_existing(profile: &Path) -> CliResult<Self> {
        let dir = store_path(profile);
        if !dir.join("records.log").exists() {
            return Err(format!("No mapping store found at {}", dir.display()).into());
        }
        tracing::debug!(path = %dir.display(), "opening mapping store");
        let latch = Arc::new(FailureLatch::default());
        let config = MapConfig::new(profile).compact_ratio(None);
        let map = ObjectMap::with_observer(config, latch.clone())?;
        Ok(Self { map, latch })
    }

    pub(crate) fn map(&self) -> &ObjectMap {
        &self.map
    }

    /// Fails if any operation so far reported an error.
    pub(crate) fn check(&self) -> CliResult<()> {
        match self.latch.first.lock().take() {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }

    /// Releases the store and waits for the lane to finish.
    pub(crate) fn finish(self) -> CliResult<()> {
        self.map.shutdown().wait();
        self.check()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use syncmap_core::RecordCategory;
    use tempfile::TempDir;

    /// A profile with one bookmark mapping and one pending create.
    pub(crate) fn seeded_profile() -> TempDir {
        let profile = tempfile::tempdir().unwrap();
        let map = ObjectMap::new(MapConfig::new(profile.path())).unwrap();
        map.set_api_version("0");
        assert!(map
            .save_object_id_and_order(RecordCategory::Bookmark, "1", "obj-1", "1.0.1")
            .wait());
        map.save_get_delete_not_synced_records(
            RecordCategory::Bookmark,
            syncmap_core::RecordAction::Create,
            ["1".to_string()].into_iter().collect(),
            syncmap_core::NotSyncedOperation::Add,
        )
        .wait();
        map.shutdown().wait();
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncmap_core::RecordCategory;

    #[test]
    fn missing_store_is_an_error() {
        let profile = tempfile::tempdir().unwrap();
        assert!(Store::open_existing(profile.path()).is_err());
        assert!(!store_path(profile.path()).exists());
    }

    #[test]
    fn opening_does_not_compact() {
        let profile = tempfile::tempdir().unwrap();
        let map = ObjectMap::new(MapConfig::new(profile.path())).unwrap();
        map.set_api_version("0");
        for round in 0..300 {
            let order = format!("1.{round}");
            let _ = map.save_object_id_and_order(RecordCategory::Bookmark, "1", "obj-1", order);
        }
        let frames = map.summary().wait().unwrap().frames;
        map.shutdown().wait();
        assert_eq!(frames, 600);

        let log = store_path(profile.path()).join("records.log");
        let before = std::fs::read(&log).unwrap();

        let store = Store::open_existing(profile.path()).unwrap();
        let summary = store.map().summary().wait().unwrap();
        store.finish().unwrap();

        assert_eq!(summary.frames, frames);
        assert_eq!(std::fs::read(&log).unwrap(), before);
    }

    #[test]
    fn failures_surface_through_check() {
        let profile = testing::seeded_profile();
        let store = Store::open_existing(profile.path()).unwrap();
        assert!(!store.map().reset_key("").wait());
        assert!(store.check().is_err());
        assert!(store.check().is_ok());
        store.finish().unwrap();
    }
}
