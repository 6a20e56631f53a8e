//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with an operating system tool.

pub mod connections;
pub mod pfctl;
pub mod process;
mod utils;

// Re-export main types for convenience
pub use connections::SystemConnections;
pub use pfctl::Pfctl;
pub use process::PsProcessTable;
