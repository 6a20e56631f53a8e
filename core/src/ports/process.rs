//! Process table port (interface).

use crate::domain::ProcessEntry;
use crate::error::Result;

/// Port for reading the live process table.
pub trait ProcessTablePort: Send + Sync {
    /// List every running process with its owning uid.
    fn processes(&self) -> impl std::future::Future<Output = Result<Vec<ProcessEntry>>> + Send;
}
