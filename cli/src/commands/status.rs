//! Status command - show blocked and persisted applications.

use anyhow::Result;
use netcut_core::SystemEngine;

use super::{format_epoch, print_json};

pub async fn run(engine: &SystemEngine, json: bool) -> Result<()> {
    let statuses = engine.status().await?;

    if json {
        return print_json(&statuses);
    }

    if statuses.is_empty() {
        println!("Nothing is blocked.");
        return Ok(());
    }

    println!(
        "{:<24} {:<8} {:<10} {:<8} UNBLOCKS AT",
        "APP", "ACTIVE", "PERSISTED", "RUNNING"
    );
    println!("{}", "-".repeat(72));

    for status in &statuses {
        let unblock_at = status
            .unblock_at
            .map(format_epoch)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<8} {:<10} {:<8} {}",
            status.app,
            yes_no(status.active),
            yes_no(status.persisted),
            yes_no(status.running),
            unblock_at
        );
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
