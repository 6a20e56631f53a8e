//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with the operating system. Implementations live in `adapters`;
//! tests substitute in-memory fakes so resolvers and stores run unprivileged.

mod connections;
mod filter;
mod process;

pub use connections::ConnectionTablePort;
pub use filter::PacketFilterPort;
pub use process::ProcessTablePort;
