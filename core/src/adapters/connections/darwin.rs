//! macOS connection table implementation using lsof.

use std::collections::HashSet;
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::adapters::utils::Utils;
use crate::domain::Connection;
use crate::error::{Error, Result};

use super::ConnectionSource;

/// macOS-specific connection table using lsof.
pub struct DarwinConnections;

impl DarwinConnections {
    /// Create a new macOS connection table.
    pub fn new() -> Self {
        Self
    }

    /// Parse lsof output into connections.
    ///
    /// Expected lsof output format:
    /// ```text
    /// COMMAND          PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
    /// Google\x20Chrome 501  user   23u  IPv4 0x3d8015e195af1f3f      0t0  TCP 192.168.1.5:52344->142.250.72.46:443 (ESTABLISHED)
    /// ```
    pub(crate) fn parse_lsof_output(&self, output: &str) -> Vec<Connection> {
        let mut connections = Vec::new();
        let mut seen: HashSet<(u32, u16)> = HashSet::new();

        // Skip header line
        for line in output.lines().skip(1) {
            if line.is_empty() {
                continue;
            }

            // Parse lsof columns: COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 9 {
                continue;
            }

            let process_name = Utils::unescape_command(components[0]);

            let pid: u32 = match components[1].parse() {
                Ok(p) => p,
                Err(_) => continue,
            };

            // Search backwards for the NAME column; skip device ids and offsets
            let name = (8..components.len())
                .rev()
                .map(|i| components[i])
                .find(|c| c.contains(':') && !c.starts_with("0x") && !c.starts_with("0t"));
            let Some(name) = name else {
                continue;
            };

            let (local_address, local_port) = match Utils::parse_local_endpoint(name) {
                Some(endpoint) => endpoint,
                None => continue,
            };

            if !seen.insert((pid, local_port)) {
                continue;
            }

            connections.push(Connection {
                pid,
                process_name,
                local_address,
                local_port,
            });
        }

        connections
    }
}

/// Decide whether an lsof run produced a usable table.
///
/// lsof exits 1 with no output when nothing matches, and also exits 1 after
/// printing only warnings. Any other message on stderr is a failure.
fn check_lsof_status(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("lsof: WARNING"))
        .collect();
    if errors.is_empty() {
        if !stderr.trim().is_empty() {
            tracing::debug!("lsof warnings: {}", stderr.trim());
        }
        return Ok(());
    }

    Err(Error::CommandFailed(format!(
        "lsof failed ({}): {}",
        output.status,
        errors.join("; ")
    )))
}

impl Default for DarwinConnections {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSource for DarwinConnections {
    /// List established TCP connections using lsof.
    ///
    /// Executes: `lsof -iTCP -sTCP:ESTABLISHED -P -n +c 0`
    ///
    /// Flags explained:
    /// - -iTCP: Show only TCP sockets
    /// - -sTCP:ESTABLISHED: Show only established connections
    /// - -P: Show port numbers (don't resolve to service names)
    /// - -n: Show IP addresses (don't resolve to hostnames)
    /// - +c 0: Show full command name (unlimited length)
    async fn established(&self) -> Result<Vec<Connection>> {
        let output = Command::new("/usr/sbin/lsof")
            .args(["-iTCP", "-sTCP:ESTABLISHED", "-P", "-n", "+c", "0"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run lsof: {}", e)))?;
        check_lsof_status(&output)?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in lsof output: {}", e)))?;

        Ok(self.parse_lsof_output(&stdout))
    }
}
