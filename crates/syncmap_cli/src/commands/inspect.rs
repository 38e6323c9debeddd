//! Inspect command implementation.

use super::{CliResult, Store};
use serde::Serialize;
use std::path::Path;
use syncmap_core::StoreSummary;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Size and entry counts.
    #[serde(flatten)]
    pub summary: StoreSummary,
}

/// Runs the inspect command.
pub fn run(profile: &Path, format: &str) -> CliResult<()> {
    let store = Store::open_existing(profile)?;
    let summary = store.map().summary().wait();
    let path = store
        .map()
        .store_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    store.finish()?;

    let result = InspectResult {
        path,
        summary: summary.ok_or("Could not read store statistics")?,
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Mapping store: {}", result.path);
    println!("  Log size:     {} bytes", result.summary.log_bytes);
    println!("  Log frames:   {}", result.summary.frames);
    println!("  Records:      {}", result.summary.records);
    println!("  Object ids:   {}", result.summary.object_ids);
}
