//! Observer sink for diagnostics.
//!
//! Failures, contract violations and inconsistencies are reported through a
//! [`MapObserver`] rather than logged in place. The default
//! [`TracingObserver`] turns the callbacks into `tracing` events.

use crate::error::MapError;
use std::path::Path;

/// Receives diagnostics from the mapping store.
///
/// All callbacks run on the serialized lane, except contract violations
/// raised by [`ObjectMap::set_api_version`](crate::ObjectMap::set_api_version),
/// which run on the caller. Every method has an empty default.
pub trait MapObserver: Send + Sync {
    /// The store was opened.
    fn store_opened(&self, path: Option<&Path>, entries: usize) {
        let _ = (path, entries);
    }

    /// The store handle was released.
    fn store_closed(&self) {}

    /// The store directory was removed.
    fn store_destroyed(&self, path: Option<&Path>) {
        let _ = path;
    }

    /// An operation failed and resolved to its failure value.
    fn operation_failed(&self, operation: &'static str, error: &MapError) {
        let _ = (operation, error);
    }

    /// The caller broke the usage contract.
    fn contract_violation(&self, operation: &'static str, error: &MapError) {
        let _ = (operation, error);
    }

    /// Stored entries disagree with each other; reported as a miss.
    fn inconsistency(&self, operation: &'static str, detail: &str) {
        let _ = (operation, detail);
    }

    /// Dropping the mapping of an id removed from a final-delete set failed.
    ///
    /// The set update itself still goes ahead.
    fn cleanup_failed(&self, local_id: &str, error: &MapError) {
        let _ = (local_id, error);
    }
}

/// Observer that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MapObserver for TracingObserver {
    fn store_opened(&self, path: Option<&Path>, entries: usize) {
        match path {
            Some(path) => tracing::debug!(path = %path.display(), entries, "mapping store opened"),
            None => tracing::debug!(entries, "in-memory mapping store opened"),
        }
    }

    fn store_closed(&self) {
        tracing::debug!("mapping store closed");
    }

    fn store_destroyed(&self, path: Option<&Path>) {
        if let Some(path) = path {
            tracing::info!(path = %path.display(), "mapping store destroyed");
        }
    }

    fn operation_failed(&self, operation: &'static str, error: &MapError) {
        match error {
            MapError::Decode { .. } => tracing::warn!(operation, %error, "undecodable record"),
            _ => tracing::error!(operation, %error, "mapping operation failed"),
        }
    }

    fn contract_violation(&self, operation: &'static str, error: &MapError) {
        tracing::error!(operation, %error, "contract violation");
    }

    fn inconsistency(&self, operation: &'static str, detail: &str) {
        tracing::warn!(operation, detail, "inconsistent mapping");
    }

    fn cleanup_failed(&self, local_id: &str, error: &MapError) {
        tracing::warn!(local_id, %error, "failed to drop mapping of deleted record");
    }
}
