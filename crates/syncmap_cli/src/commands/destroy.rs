//! Destroy command implementation.

use super::{CliResult, Store};
use std::path::Path;

/// Runs the destroy command.
pub fn run(profile: &Path) -> CliResult<()> {
    let store = Store::open_existing(profile)?;
    let destroyed = store.map().destroy().wait();
    store.finish()?;

    if !destroyed {
        return Err("Store could not be destroyed".into());
    }
    println!("Destroyed mapping store in {}", profile.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::seeded_profile;
    use syncmap_core::store_path;

    #[test]
    fn removes_store_directory() {
        let profile = seeded_profile();
        run(profile.path()).unwrap();
        assert!(!store_path(profile.path()).exists());
        assert!(run(profile.path()).is_err());
    }
}
