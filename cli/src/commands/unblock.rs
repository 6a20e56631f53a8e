//! Unblock command - remove one block or all of them.

use anyhow::{bail, Result};
use netcut_core::SystemEngine;

use super::print_json;

pub async fn run(engine: &SystemEngine, app: Option<&str>, all: bool, json: bool) -> Result<()> {
    if all {
        let count = engine.unblock_all().await?;
        if json {
            return print_json(&serde_json::json!({ "unblocked": count }));
        }
        println!("Unblocked {} application(s)", count);
        return Ok(());
    }

    let Some(app) = app else {
        bail!("An application name or --all is required");
    };
    let removed = engine.unblock(app).await?;
    if json {
        return print_json(&serde_json::json!({ "app": app, "unblocked": removed }));
    }

    if removed {
        println!("Unblocked {}", app);
    } else {
        println!("{} was not blocked", app);
    }
    Ok(())
}
