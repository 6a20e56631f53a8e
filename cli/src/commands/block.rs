//! Block command - apply rules for an application or a group.

use anyhow::{bail, Result};
use clap::Args;
use netcut_core::domain::parse_duration;
use netcut_core::{now_epoch, BlockOptions, BlockOutcome, Config, SystemEngine};

use super::{format_epoch, print_json};

#[derive(Args)]
pub struct BlockArgs {
    /// Application name (e.g. "chrome", "Zoom.app")
    #[arg(required_unless_present = "group", conflicts_with = "group")]
    pub app: Option<String>,

    /// Block every member of a configured group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Unblock automatically after this long (e.g. 30s, 10m, 2h)
    #[arg(long = "for", value_name = "DURATION")]
    pub duration: Option<String>,

    /// Keep the block across reboots
    #[arg(short, long)]
    pub persist: bool,

    /// Show the rules without applying them
    #[arg(long)]
    pub dry_run: bool,
}

/// Merge command line flags with the configured defaults.
fn options(args: &BlockArgs, config: &Config) -> Result<BlockOptions> {
    let duration = args
        .duration
        .as_deref()
        .or(config.defaults.block_duration.as_deref());

    Ok(BlockOptions {
        duration_secs: duration.map(parse_duration).transpose()?,
        persist: args.persist || config.defaults.persistent_block,
        dry_run: args.dry_run,
    })
}

pub async fn run(engine: &SystemEngine, config: &Config, args: BlockArgs, json: bool) -> Result<()> {
    let options = options(&args, config)?;
    let now = now_epoch();

    if let Some(group) = &args.group {
        let results = engine.block_group(group, &options, now).await?;
        if json {
            return print_json(&results);
        }

        for member in &results {
            match (&member.outcome, &member.error) {
                (Some(outcome), _) => print_outcome(outcome),
                (None, Some(error)) => println!("Skipped {}: {}", member.app, error),
                (None, None) => {}
            }
        }
        if results.iter().all(|m| m.outcome.is_none()) {
            bail!("No member of group '{}' could be blocked", group);
        }
        return Ok(());
    }

    let Some(app) = args.app.as_deref() else {
        bail!("An application name or --group is required");
    };
    let outcome = engine.block(app, &options, now).await?;
    if json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

pub async fn dry_run(engine: &SystemEngine, app: &str, json: bool) -> Result<()> {
    let options = BlockOptions {
        dry_run: true,
        ..BlockOptions::default()
    };
    let outcome = engine.block(app, &options, now_epoch()).await?;
    if json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &BlockOutcome) {
    if let Some(preview) = &outcome.preview {
        println!("Would block {}:", outcome.identity);
        print!("{}", preview);
        return;
    }

    if outcome.fallback {
        println!(
            "Blocked {} (no open connections, blocking all traffic of uid {})",
            outcome.identity, outcome.identity.uid
        );
    } else {
        println!("Blocked {} on ports {}", outcome.identity, outcome.ports);
    }
    if outcome.persisted {
        println!("  persisted across reboots");
    }
    if let Some(at) = outcome.unblock_at {
        println!("  unblocks at {}", format_epoch(at));
    }
}
