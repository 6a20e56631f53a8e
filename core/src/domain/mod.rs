//! Domain layer - Pure business logic and data models.
//!
//! This module contains the types that describe applications, their network
//! identity and the pf rules compiled from it. These types have no I/O
//! dependencies and can be tested in isolation.

mod app;
mod process;
mod rule;
mod schedule;

// Re-export all domain types
pub use app::{normalize, AppName};
pub use process::{Connection, NetworkProcess, ProcessEntry, ProcessIdentity};
pub use rule::{compile, render, Action, Direction, FirewallRule, PortSet, Protocol, Selector};
pub use schedule::{parse_duration, ScheduleEntry};
