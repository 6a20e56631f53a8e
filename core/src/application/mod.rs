//! Application layer - Use case services.
//!
//! This module contains the resolvers and stores that the engine composes.
//!
//! Services are designed to be thin orchestrators that:
//! - Accept domain types as inputs
//! - Use ports (traits) for operating system access
//! - Return domain types as outputs

mod activity_log;
mod anchor_store;
mod persistence_store;
mod port_resolver;
mod process_resolver;
pub mod registration;
mod schedule_store;

pub use activity_log::ActivityLog;
pub use anchor_store::AnchorStore;
pub use persistence_store::PersistenceStore;
pub use port_resolver::PortResolver;
pub use process_resolver::ProcessResolver;
pub use schedule_store::{ScheduleCheck, ScheduleStore};
