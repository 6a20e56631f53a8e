//! Export command - write all active rules into one file.

use std::path::Path;

use anyhow::Result;
use netcut_core::SystemEngine;

use super::print_json;

pub async fn run(engine: &SystemEngine, file: &Path, json: bool) -> Result<()> {
    let count = engine.export(file).await?;
    if json {
        return print_json(&serde_json::json!({ "file": file, "exported": count }));
    }
    println!("Exported {} anchor(s) to {}", count, file.display());
    Ok(())
}
