//! Log command - show or clear the activity log.

use anyhow::Result;
use netcut_core::SystemEngine;

use super::print_json;

pub async fn show(engine: &SystemEngine, limit: usize, json: bool) -> Result<()> {
    let records = engine.activity(limit).await?;
    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No activity recorded.");
        return Ok(());
    }
    for record in &records {
        println!("{}", record);
    }
    Ok(())
}

pub async fn clear(engine: &SystemEngine) -> Result<()> {
    if engine.clear_activity().await? {
        println!("Activity log cleared");
    } else {
        println!("Activity log is already empty");
    }
    Ok(())
}
