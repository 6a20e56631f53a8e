//! pf packet filter adapter driven through `pfctl`.
//!
//! This is the only place in the crate that decides about privilege. Anchor
//! files, `/etc/pf.conf` and `pfctl` itself all need root, so mutating
//! operations are refused up front when the effective uid is not root.
//! Commands are always spawned as argument vectors, never through a shell.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::ports::PacketFilterPort;

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Build the argument vector for `program args...`.
fn argv(program: &Path, args: &[&str]) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(program.display().to_string());
    argv.extend(args.iter().map(|a| a.to_string()));
    argv
}

/// Packet filter controlled via `pfctl`.
pub struct Pfctl {
    program: PathBuf,
    privileged: bool,
}

impl Pfctl {
    /// Create a pfctl driver for the given binary, checking the effective uid.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_privilege(program, running_as_root())
    }

    pub fn with_privilege(program: impl Into<PathBuf>, privileged: bool) -> Self {
        Self {
            program: program.into(),
            privileged,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        let argv = argv(&self.program, args);
        tracing::debug!("Running {:?}", argv);

        Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run {}: {}", argv[0], e)))
    }
}

/// Map a failed pfctl invocation to an error, keeping pfctl's message verbatim.
fn command_error(action: &str, output: &Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let lower = stderr.to_lowercase();
    if lower.contains("permission denied") || lower.contains("operation not permitted") {
        Error::PermissionDenied(stderr)
    } else {
        Error::CommandFailed(format!("pfctl {} failed ({}): {}", action, output.status, stderr))
    }
}

/// `pfctl -e` on an enabled filter exits non-zero with this message.
fn is_already_enabled(output: &Output) -> bool {
    String::from_utf8_lossy(&output.stderr)
        .to_lowercase()
        .contains("already enabled")
}

impl PacketFilterPort for Pfctl {
    fn ensure_privileged(&self) -> Result<()> {
        if self.privileged {
            Ok(())
        } else {
            Err(Error::PermissionDenied(
                "changing pf rules requires root; re-run with sudo".to_string(),
            ))
        }
    }

    /// Executes: `pfctl -f <main_conf>` then `pfctl -e`
    async fn reload(&self, main_conf: &Path) -> Result<()> {
        if !cfg!(target_os = "macos") {
            return Err(Error::UnsupportedPlatform(format!(
                "pf is only managed on macOS, not {}",
                std::env::consts::OS
            )));
        }

        let conf = main_conf.to_string_lossy();
        let output = self.run(&["-f", conf.as_ref()]).await?;
        if !output.status.success() {
            return Err(command_error("-f", &output));
        }

        let output = self.run(&["-e"]).await?;
        if !output.status.success() {
            if is_already_enabled(&output) {
                tracing::debug!("pf already enabled");
            } else {
                return Err(command_error("-e", &output));
            }
        }

        tracing::info!("Reloaded pf from {}", main_conf.display());
        Ok(())
    }
}
