//! Dump command implementation.

use super::{CliResult, Store};
use std::path::Path;
use syncmap_core::DumpEntry;

/// Runs the dump command.
pub fn run(profile: &Path, format: &str) -> CliResult<()> {
    let store = Store::open_existing(profile)?;
    let entries = store.map().dump().wait();
    store.finish()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(&entries);
        }
    }

    Ok(())
}

fn print_text_output(entries: &[DumpEntry]) {
    for entry in entries {
        println!("{:<10} <{}>: <{}>", entry.namespace.name(), entry.key, entry.value);
    }
    println!("{} entries", entries.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::seeded_profile;

    #[test]
    fn dumps_seeded_store() {
        let profile = seeded_profile();
        run(profile.path(), "text").unwrap();
        run(profile.path(), "json").unwrap();
    }
}
