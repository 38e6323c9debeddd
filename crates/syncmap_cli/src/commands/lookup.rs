//! Lookup command implementation.

use super::{CliResult, Store};
use std::path::Path;
use syncmap_core::RecordCategory;

/// What to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Resolve a local id to its object id and order.
    LocalId(String),
    /// Resolve an object id to its local id.
    ObjectId(String),
}

/// Runs the lookup command.
pub fn run(profile: &Path, category: RecordCategory, target: Target) -> CliResult<()> {
    let store = Store::open_existing(profile)?;
    let line = resolve(&store, category, &target);
    store.finish()?;

    println!("{}", line.ok_or("Not found")?);
    Ok(())
}

fn resolve(store: &Store, category: RecordCategory, target: &Target) -> Option<String> {
    match target {
        Target::LocalId(local_id) => {
            let meta = store
                .map()
                .get_metadata_by_local_id(category, local_id.as_str())
                .wait()?;
            let order = meta.order.unwrap_or_default();
            let api_version = meta.api_version.unwrap_or_default();
            Some(format!(
                "{category} {local_id} -> {} (order {order:?}, api {api_version:?})",
                meta.object_id
            ))
        }
        Target::ObjectId(object_id) => {
            let local_id = store
                .map()
                .get_local_id_by_object_id(category, object_id.as_str())
                .wait()?;
            Some(format!("{object_id} -> {category} {local_id}"))
        }
    }
}
