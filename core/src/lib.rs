//! Netcut Core Library
//!
//! Per-application network blocking on top of the pf packet filter.
//! Provides functionality to:
//! - Resolve an application name to a running process and its live ports
//! - Compile pf block rules and manage one anchor per application
//! - Persist blocks across reboots and expire timed blocks
//! - Manage user configuration (paths, groups, allowlist)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//! - `engine`: The operations the command line calls
//!
//! # Platform Support
//! - macOS: Uses `ps`, `lsof` and `pfctl`
//! - Linux: Uses `ps` and `ss` for inspection; pf is not available

// Hexagonal architecture layers
pub mod domain;
pub mod ports;
pub mod adapters;
pub mod application;

pub mod config;
pub mod engine;
pub mod error;
pub mod fsutil;
pub mod logging;

#[cfg(test)]
mod testing;

// Re-export domain types (primary API)
pub use domain::{AppName, FirewallRule, NetworkProcess, PortSet, ProcessIdentity, ScheduleEntry};

// Re-export other commonly used types
pub use config::{Config, ConfigStore, Settings};
pub use engine::{
    now_epoch, BlockOptions, BlockOutcome, BlockStatus, GroupMemberOutcome, NetcutEngine,
    ScheduleReport, SystemEngine,
};
pub use error::{Error, Result};
pub use logging::init_logging;
