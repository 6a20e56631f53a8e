//! Packet filter port (interface).

use std::path::Path;

use crate::error::Result;

/// Port for driving the live packet filter.
///
/// This is the privileged boundary: implementations decide whether the
/// process may change filter state, nothing else in the crate does.
pub trait PacketFilterPort: Send + Sync {
    /// Fail with `PermissionDenied` when this process cannot change the filter.
    ///
    /// Callers check this before touching anchors or the main configuration,
    /// so an unprivileged run fails before any state is written.
    fn ensure_privileged(&self) -> Result<()>;

    /// Reload the filter from the main configuration and make sure it is enabled.
    ///
    /// Must be idempotent: reloading an unchanged, already-enabled filter is not an error.
    fn reload(&self, main_conf: &Path) -> impl std::future::Future<Output = Result<()>> + Send;
}
