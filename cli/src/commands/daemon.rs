//! Daemon command - run the schedule check on an interval.

use std::time::Duration;

use anyhow::{bail, Result};
use netcut_core::{now_epoch, SystemEngine};
use tokio::time::MissedTickBehavior;

pub async fn run(engine: &SystemEngine, interval_secs: u64) -> Result<()> {
    if interval_secs == 0 {
        bail!("Interval must be at least one second");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!("Checking schedule every {}s, Ctrl-C to stop", interval_secs);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.check_schedule(now_epoch()).await {
                    Ok(report) if !report.unblocked.is_empty() || !report.failed.is_empty() => {
                        super::schedule::print_report(&report);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Schedule check failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping");
                return Ok(());
            }
        }
    }
}
