//! Error types for the netcut-core library.

use std::path::Path;

use thiserror::Error;

/// Result type alias for netcut operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving applications and managing pf anchors.
#[derive(Error, Debug)]
pub enum Error {
    /// No running process matched the application name.
    #[error("No running process matches '{0}'")]
    ProcessNotFound(String),

    /// There is no live anchor for the application.
    #[error("No active block for '{0}'")]
    AnchorNotFound(String),

    /// The application name cannot be used as an anchor identity.
    #[error("Invalid application name '{name}': {reason}")]
    InvalidAppName { name: String, reason: String },

    /// A block duration could not be parsed or was not positive.
    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    /// The application is on the configured allowlist.
    #[error("'{0}' is allowlisted and cannot be blocked")]
    Allowlisted(String),

    /// The requested application group is not configured.
    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    /// A schedule log line could not be parsed.
    #[error("Corrupt schedule entry '{line}': {reason}")]
    ScheduleCorrupt { line: String, reason: String },

    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// Permission denied for a privileged file or filter operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Attach a path to an I/O error, promoting permission failures to
    /// [`Error::PermissionDenied`] so they surface as-is to the caller.
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Error::PermissionDenied(format!("{}: {}", path.display(), err))
        } else {
            Error::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {}", path.display(), err),
            ))
        }
    }
}
