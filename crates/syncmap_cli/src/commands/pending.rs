//! Pending command implementation.

use super::{CliResult, Store};
use std::collections::BTreeSet;
use std::path::Path;
use syncmap_core::{not_synced_key, NotSyncedOperation, RecordAction, RecordCategory};

/// Runs the pending command.
pub fn run(profile: &Path, category: RecordCategory, action: RecordAction) -> CliResult<()> {
    let key = not_synced_key(category, action)?;
    let store = Store::open_existing(profile)?;
    let ids = store
        .map()
        .save_get_delete_not_synced_records(category, action, BTreeSet::new(), NotSyncedOperation::Get)
        .wait();
    store.finish()?;

    println!("{key}: {} pending", ids.len());
    for id in &ids {
        println!("  {id}");
    }
    Ok(())
}
