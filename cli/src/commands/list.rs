//! List command - show processes with established connections.

use anyhow::Result;
use netcut_core::SystemEngine;

use super::print_json;

pub async fn run(engine: &SystemEngine, json: bool) -> Result<()> {
    let processes = engine.list().await?;

    if json {
        return print_json(&processes);
    }

    if processes.is_empty() {
        println!("No processes with established connections found.");
        return Ok(());
    }

    // Full names when piped, truncated for the terminal
    let width = if atty::is(atty::Stream::Stdout) { 24 } else { usize::MAX };

    // Table header
    println!("{:<8} {:<6} {:<24} PORTS", "PID", "UID", "PROCESS");
    println!("{}", "-".repeat(60));

    for process in &processes {
        let uid = process
            .uid
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<6} {:<24} {}",
            process.pid,
            uid,
            truncate(&process.name, width),
            process.ports
        );
    }

    println!("\nTotal: {} processes", processes.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{}…", head)
    }
}
