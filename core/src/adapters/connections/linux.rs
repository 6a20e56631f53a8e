//! Linux connection table implementation using ss.

use std::collections::HashSet;
use std::process::Stdio;

use regex::Regex;
use tokio::process::Command;

use crate::adapters::utils::Utils;
use crate::domain::Connection;
use crate::error::{Error, Result};

use super::ConnectionSource;

/// Linux-specific connection table.
pub struct LinuxConnections;

impl LinuxConnections {
    pub fn new() -> Self {
        Self
    }

    /// Parse ss output into connections.
    ///
    /// Expected ss output format (the state column is omitted when filtering by state):
    /// ```text
    /// 0      0      192.168.1.5:52344     142.250.72.46:443    users:(("chrome",pid=501,fd=23))
    /// ```
    /// A socket shared by several processes lists every owner in `users:(...)`.
    pub(crate) fn parse_ss_output(&self, output: &str) -> Vec<Connection> {
        let mut connections = Vec::new();
        let mut seen: HashSet<(u32, u16)> = HashSet::new();

        let regex = Regex::new(r#"\("(.+?)",pid=(\d+),fd=(\d+)\)"#).unwrap();

        for line in output.lines() {
            if line.is_empty() {
                continue;
            }

            let mut components: Vec<&str> = line.split_whitespace().collect();
            // Older ss releases still print the state column
            if components
                .first()
                .is_some_and(|c| c.parse::<u64>().is_err())
            {
                components.remove(0);
            }
            if components.len() < 5 {
                continue;
            }

            let (local_address, local_port) = match Utils::parse_address(components[2]) {
                Some(endpoint) => endpoint,
                None => continue,
            };

            let users = components[4..].join(" ");
            for caps in regex.captures_iter(&users) {
                let pid: u32 = match caps[2].parse() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                if !seen.insert((pid, local_port)) {
                    continue;
                }

                connections.push(Connection {
                    pid,
                    process_name: caps[1].to_string(),
                    local_address: local_address.clone(),
                    local_port,
                });
            }
        }

        connections
    }
}

impl Default for LinuxConnections {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSource for LinuxConnections {
    /// List established TCP connections.
    ///
    /// Executes: `ss -Htnp state established`
    ///
    /// Flags explained:
    /// -H, --no-header     Suppress header line
    /// -t, --tcp           display only TCP sockets
    /// -n, --numeric       don't resolve service names
    /// -p, --processes     show process using socket
    async fn established(&self) -> Result<Vec<Connection>> {
        let output = Command::new("/usr/sbin/ss")
            .args(["-Htnp", "state", "established"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run ss: {}", e)))?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ss output: {}", e)))?;

        Ok(self.parse_ss_output(&stdout))
    }
}
