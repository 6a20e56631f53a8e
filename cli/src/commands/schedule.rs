//! Check-schedule command - expire timed blocks.

use anyhow::{bail, Result};
use netcut_core::{now_epoch, ScheduleReport, SystemEngine};

use super::print_json;

/// Exits non-zero when a due unblock failed, so launchd or cron see it.
/// Failed entries stay in the log and are retried on the next check.
pub async fn check(engine: &SystemEngine, json: bool) -> Result<()> {
    let report = engine.check_schedule(now_epoch()).await?;
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if !report.failed.is_empty() {
        bail!("{} scheduled unblock(s) failed and will be retried", report.failed.len());
    }
    Ok(())
}

pub(crate) fn print_report(report: &ScheduleReport) {
    for app in &report.unblocked {
        println!("Unblocked {} (time is up)", app);
    }
    for (app, error) in &report.failed {
        println!("Failed to unblock {}: {}", app, error);
    }
    if report.corrupt > 0 {
        println!("Dropped {} malformed schedule line(s)", report.corrupt);
    }
    if report.unblocked.is_empty() && report.failed.is_empty() {
        println!("Nothing due; {} pending", report.pending);
    }
}
