//! Mapping store configuration.

use std::path::{Path, PathBuf};
use syncmap_storage::StoreOptions;

/// Directory name of the store under the profile path.
pub const DB_DIR_NAME: &str = "sync_object_map";

/// Default name of the serialized lane thread.
pub const DEFAULT_LANE_NAME: &str = "syncmap-lane";

/// Configuration for opening an [`ObjectMap`](crate::ObjectMap).
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Profile directory; the store lives in `<profile_path>/sync_object_map`.
    pub profile_path: PathBuf,

    /// Whether to sync the store log after every write.
    pub sync_on_write: bool,

    /// Compact on open once the log holds this many frames per live entry.
    pub compact_ratio: Option<u32>,

    /// Name given to the lane thread.
    pub lane_name: String,
}

impl MapConfig {
    /// Creates a configuration for the given profile directory.
    #[must_use]
    pub fn new(profile_path: impl Into<PathBuf>) -> Self {
        let defaults = StoreOptions::default();
        Self {
            profile_path: profile_path.into(),
            sync_on_write: defaults.sync_on_write,
            compact_ratio: defaults.compact_ratio,
            lane_name: DEFAULT_LANE_NAME.to_string(),
        }
    }

    /// Sets whether to sync after every write.
    #[must_use]
    pub fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the automatic compaction ratio.
    #[must_use]
    pub fn compact_ratio(mut self, ratio: Option<u32>) -> Self {
        self.compact_ratio = ratio;
        self
    }

    /// Sets the lane thread name.
    #[must_use]
    pub fn lane_name(mut self, name: impl Into<String>) -> Self {
        self.lane_name = name.into();
        self
    }

    /// Path of the store directory.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        store_path(&self.profile_path)
    }

    /// Engine options derived from this configuration.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::new()
            .create_if_missing(true)
            .sync_on_write(self.sync_on_write)
            .compact_ratio(self.compact_ratio)
    }
}

/// Returns the store directory for a profile directory.
#[must_use]
pub fn store_path(profile_path: &Path) -> PathBuf {
    profile_path.join(DB_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_engine() {
        let config = MapConfig::new("/profile");
        assert!(config.sync_on_write);
        assert_eq!(config.compact_ratio, StoreOptions::default().compact_ratio);
        assert_eq!(config.lane_name, DEFAULT_LANE_NAME);
        assert_eq!(config.store_path(), Path::new("/profile/sync_object_map"));
    }

    #[test]
    fn builder_pattern() {
        let config = MapConfig::new("/p")
            .sync_on_write(false)
            .compact_ratio(None)
            .lane_name("bookmarks-sync");

        let options = config.store_options();
        assert!(options.create_if_missing);
        assert!(!options.sync_on_write);
        assert_eq!(options.compact_ratio, None);
        assert_eq!(config.lane_name, "bookmarks-sync");
    }
}
