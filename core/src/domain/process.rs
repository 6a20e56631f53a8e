//! Process and connection models.

use serde::{Deserialize, Serialize};

use super::PortSet;

/// One row of the live process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub uid: u32,
    /// Executable name (basename of the command).
    pub name: String,
}

impl ProcessEntry {
    pub fn new(pid: u32, uid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            uid,
            name: name.into(),
        }
    }
}

/// Network identity of a running application.
///
/// Always derived fresh from the process table: pids are reused by the OS,
/// so an identity must never outlive the operation that resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub uid: u32,
    pub name: String,
}

impl From<&ProcessEntry> for ProcessIdentity {
    fn from(entry: &ProcessEntry) -> Self {
        Self {
            pid: entry.pid,
            uid: entry.uid,
            name: entry.name.clone(),
        }
    }
}

impl std::fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (pid: {}, uid: {})", self.name, self.pid, self.uid)
    }
}

/// An established connection owned by a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub pid: u32,
    /// Command name as reported by the connection table.
    pub process_name: String,
    pub local_address: String,
    pub local_port: u16,
}

/// A process currently holding network connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProcess {
    pub pid: u32,
    pub uid: Option<u32>,
    pub name: String,
    pub ports: PortSet,
}
