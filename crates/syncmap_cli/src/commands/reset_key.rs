//! Reset-key command implementation.

use super::{CliResult, Store};
use std::path::Path;

/// Runs the reset-key command.
pub fn run(profile: &Path, key: &str) -> CliResult<()> {
    let store = Store::open_existing(profile)?;
    let removed = store.map().reset_key(key).wait();
    store.finish()?;

    if removed {
        println!("Removed {key:?}");
    } else {
        println!("No entry under {key:?}");
    }
    Ok(())
}
