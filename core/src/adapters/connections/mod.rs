//! Connection table adapters.
//!
//! Platform-specific implementations of connection enumeration. Both parsers
//! are compiled everywhere so their fixtures run on any host.

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod darwin;

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
mod linux;

use crate::domain::Connection;
use crate::error::Result;
use crate::ports::ConnectionTablePort;

pub use darwin::DarwinConnections;
pub use linux::LinuxConnections;

/// The connection table for the current platform.
pub struct SystemConnections {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinConnections,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxConnections,
}

impl SystemConnections {
    /// Create a connection table for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinConnections::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxConnections::new(),
        }
    }
}

impl Default for SystemConnections {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTablePort for SystemConnections {
    #[cfg(any(target_os = "macos", target_os = "linux"))]
    async fn established(&self) -> Result<Vec<Connection>> {
        self.inner.established().await
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    async fn established(&self) -> Result<Vec<Connection>> {
        Err(crate::error::Error::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}

/// Internal trait for platform-specific implementations.
trait ConnectionSource: Send + Sync {
    fn established(&self) -> impl std::future::Future<Output = Result<Vec<Connection>>> + Send;
}
