//! Connection table port (interface).

use crate::domain::Connection;
use crate::error::Result;

/// Port for enumerating network connections.
///
/// Implementations handle platform-specific details (lsof, ss).
pub trait ConnectionTablePort: Send + Sync {
    /// List all established connections with their owning pid and local port.
    fn established(&self) -> impl std::future::Future<Output = Result<Vec<Connection>>> + Send;
}
