//! Config commands - show and edit the configuration file.

use anyhow::Result;
use netcut_core::{Config, ConfigStore};

use super::print_json;

pub fn show(store: &ConfigStore, config: &Config, json: bool) -> Result<()> {
    if json {
        return print_json(config);
    }

    println!("Config file:    {}", store.config_path().display());
    println!("Anchor dir:     {}", config.anchor_dir.display());
    println!("Persist dir:    {}", config.persist_dir.display());
    println!("Schedule file:  {}", config.schedule_file.display());
    println!("pf.conf:        {}", config.pf_conf.display());
    println!("pfctl:          {}", config.pfctl.display());
    println!("Interface:      {}", config.interface);
    println!("Activity log:   {}", config.activity_log.display());
    println!(
        "Default block:  {}{}",
        config.defaults.block_duration.as_deref().unwrap_or("until unblocked"),
        if config.defaults.persistent_block { ", persistent" } else { "" }
    );

    println!("\nAllowlist:");
    if config.allowlist.is_empty() {
        println!("  (none)");
    }
    for app in &config.allowlist {
        println!("  {}", app);
    }

    println!("\nGroups:");
    if config.groups.is_empty() {
        println!("  (none)");
    }
    for (name, members) in &config.groups {
        println!("  {}: {}", name, members.join(", "));
    }
    Ok(())
}

pub async fn init(store: &ConfigStore) -> Result<()> {
    store.ensure().await?;
    println!("Configuration at {}", store.config_path().display());
    Ok(())
}

pub async fn allow(store: &ConfigStore, app: &str) -> Result<()> {
    store.allow(app).await?;
    println!("{} will never be blocked", app);
    Ok(())
}

pub async fn disallow(store: &ConfigStore, app: &str) -> Result<()> {
    store.disallow(app).await?;
    println!("Removed {} from the allowlist", app);
    Ok(())
}

pub async fn group(store: &ConfigStore, name: &str, members: &[String]) -> Result<()> {
    store.set_group(name, members).await?;
    if members.is_empty() {
        println!("Deleted group {}", name);
    } else {
        println!("Group {}: {}", name, members.join(", "));
    }
    Ok(())
}
