//! Subcommand implementations.

pub mod block;
pub mod config;
pub mod daemon;
pub mod export;
pub mod list;
pub mod log;
pub mod persist;
pub mod schedule;
pub mod status;
pub mod unblock;

use chrono::{Local, TimeZone};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render an epoch timestamp in local time.
fn format_epoch(epoch: i64) -> String {
    match Local.timestamp_opt(epoch, 0).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => epoch.to_string(),
    }
}
