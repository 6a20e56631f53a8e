//! Process table adapter using ps.

use std::process::Stdio;

use tokio::process::Command;

use crate::domain::ProcessEntry;
use crate::error::{Error, Result};
use crate::ports::ProcessTablePort;

/// Process table backed by `ps`.
///
/// The same invocation works on macOS and Linux (procps accepts BSD-style
/// `ax` selection).
pub struct PsProcessTable;

impl PsProcessTable {
    pub fn new() -> Self {
        Self
    }

    /// Parse `ps -axo pid=,uid=,comm=` output.
    ///
    /// On macOS `comm` is the full executable path and may contain spaces:
    /// ```text
    ///   501   501 /Applications/Google Chrome.app/Contents/MacOS/Google Chrome
    /// ```
    /// Only the basename is kept.
    pub(crate) fn parse_ps_output(&self, output: &str) -> Vec<ProcessEntry> {
        let mut entries = Vec::new();

        for line in output.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut parts = trimmed.splitn(2, char::is_whitespace);
            let pid: u32 = match parts.next().and_then(|s| s.trim().parse().ok()) {
                Some(p) => p,
                None => continue,
            };

            let rest = match parts.next() {
                Some(r) => r.trim_start(),
                None => continue,
            };
            let mut parts = rest.splitn(2, char::is_whitespace);
            let uid: u32 = match parts.next().and_then(|s| s.trim().parse().ok()) {
                Some(u) => u,
                None => continue,
            };

            let command = match parts.next() {
                Some(c) => c.trim(),
                None => continue,
            };
            let name = command.rsplit('/').next().unwrap_or(command);
            if name.is_empty() {
                continue;
            }

            entries.push(ProcessEntry::new(pid, uid, name));
        }

        entries
    }
}

impl Default for PsProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTablePort for PsProcessTable {
    /// Executes: `ps -axo pid=,uid=,comm=`
    async fn processes(&self) -> Result<Vec<ProcessEntry>> {
        let output = Command::new("/bin/ps")
            .args(["-axo", "pid=,uid=,comm="])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run ps: {}", e)))?;

        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "ps exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ps output: {}", e)))?;

        Ok(self.parse_ps_output(&stdout))
    }
}
