//! Netcut CLI - Block network access per application
//!
//! A command-line tool for blocking and unblocking applications with pf
//! anchors, timed blocks, and blocks that survive a reboot.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use netcut_core::{ConfigStore, SystemEngine};

use commands::block::BlockArgs;

#[derive(Parser)]
#[command(name = "netcut")]
#[command(author, version, about = "Block network access per application")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (also enabled by NETCUT_DEBUG)
    #[arg(long, global = true)]
    debug: bool,

    /// Use a different configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Block an application or a group of applications
    Block(BlockArgs),

    /// Show the rules a block would apply without applying them
    DryRun {
        /// Application name
        app: String,
    },

    /// Remove a block
    Unblock {
        /// Application name
        #[arg(required_unless_present = "all")]
        app: Option<String>,

        /// Remove every block
        #[arg(long, conflicts_with = "app")]
        all: bool,
    },

    /// List processes with established connections
    #[command(alias = "ls")]
    List,

    /// Show blocked and persisted applications
    Status,

    /// Write all active rules into one file
    Export {
        /// Output file
        file: PathBuf,
    },

    /// Remove blocks whose time has run out
    CheckSchedule,

    /// Recreate persisted blocks (run at boot)
    LoadPersisted,

    /// Keep an active block across reboots
    Persist {
        /// Application name
        app: String,
    },

    /// Stop restoring one application's block at boot
    Unpersist {
        /// Application name
        app: String,
    },

    /// Forget every persisted block
    ClearPersisted,

    /// Check the schedule periodically until interrupted
    Daemon {
        /// Seconds between checks
        #[arg(long, default_value = "30")]
        interval: u64,
    },

    /// Show or clear the activity log
    Log {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Delete the log
        #[arg(long)]
        clear: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write the default configuration if none exists
    Init,
    /// Never block an application
    Allow { app: String },
    /// Remove an application from the allowlist
    Disallow { app: String },
    /// Set the members of a group (no members deletes it)
    Group { name: String, members: Vec<String> },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    netcut_core::init_logging(cli.debug);

    let store = match cli.config {
        Some(path) => ConfigStore::with_path(path),
        None => ConfigStore::new()?,
    };
    let config = store.load().await?;
    let engine = SystemEngine::system(&config);

    match cli.command {
        Commands::Block(args) => {
            commands::block::run(&engine, &config, args, cli.json).await?;
        }
        Commands::DryRun { app } => {
            commands::block::dry_run(&engine, &app, cli.json).await?;
        }
        Commands::Unblock { app, all } => {
            commands::unblock::run(&engine, app.as_deref(), all, cli.json).await?;
        }
        Commands::List => {
            commands::list::run(&engine, cli.json).await?;
        }
        Commands::Status => {
            commands::status::run(&engine, cli.json).await?;
        }
        Commands::Export { file } => {
            commands::export::run(&engine, &file, cli.json).await?;
        }
        Commands::CheckSchedule => {
            commands::schedule::check(&engine, cli.json).await?;
        }
        Commands::LoadPersisted => {
            commands::persist::load(&engine, cli.json).await?;
        }
        Commands::Persist { app } => {
            commands::persist::save(&engine, &app, cli.json).await?;
        }
        Commands::Unpersist { app } => {
            commands::persist::remove(&engine, &app, cli.json).await?;
        }
        Commands::ClearPersisted => {
            commands::persist::clear(&engine, cli.json).await?;
        }
        Commands::Daemon { interval } => {
            commands::daemon::run(&engine, interval).await?;
        }
        Commands::Log { limit, clear } => {
            if clear {
                commands::log::clear(&engine).await?;
            } else {
                commands::log::show(&engine, limit, cli.json).await?;
            }
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config::show(&store, &config, cli.json)?,
            ConfigAction::Init => commands::config::init(&store).await?,
            ConfigAction::Allow { app } => commands::config::allow(&store, &app).await?,
            ConfigAction::Disallow { app } => commands::config::disallow(&store, &app).await?,
            ConfigAction::Group { name, members } => {
                commands::config::group(&store, &name, &members).await?
            }
        },
    }

    Ok(())
}
