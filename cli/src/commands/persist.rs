//! Persistence commands - blocks that survive a reboot.

use anyhow::Result;
use netcut_core::SystemEngine;

use super::print_json;

pub async fn load(engine: &SystemEngine, json: bool) -> Result<()> {
    let restored = engine.load_persisted().await?;
    if json {
        return print_json(&restored);
    }

    if restored.is_empty() {
        println!("No persisted blocks.");
    } else {
        println!("Restored {}", restored.join(", "));
    }
    Ok(())
}

pub async fn save(engine: &SystemEngine, app: &str, json: bool) -> Result<()> {
    engine.persist(app).await?;
    if json {
        return print_json(&serde_json::json!({ "app": app, "persisted": true }));
    }
    println!("{} will stay blocked after reboot", app);
    Ok(())
}

pub async fn remove(engine: &SystemEngine, app: &str, json: bool) -> Result<()> {
    let removed = engine.unpersist(app).await?;
    if json {
        return print_json(&serde_json::json!({ "app": app, "unpersisted": removed }));
    }
    if removed {
        println!("{} will no longer be restored at boot", app);
    } else {
        println!("{} was not persisted", app);
    }
    Ok(())
}

pub async fn clear(engine: &SystemEngine, json: bool) -> Result<()> {
    let count = engine.clear_persisted().await?;
    if json {
        return print_json(&serde_json::json!({ "cleared": count }));
    }
    println!("Cleared {} persisted block(s)", count);
    Ok(())
}
