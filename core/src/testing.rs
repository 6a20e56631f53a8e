//! In-memory port implementations for unit tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::domain::{Connection, ProcessEntry};
use crate::error::{Error, Result};
use crate::ports::{ConnectionTablePort, PacketFilterPort, ProcessTablePort};

/// Mock process table.
#[derive(Clone, Default)]
pub struct MockProcessTable {
    entries: Arc<RwLock<Vec<ProcessEntry>>>,
}

impl MockProcessTable {
    pub fn new(entries: Vec<ProcessEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn set(&self, entries: Vec<ProcessEntry>) {
        *self.entries.write() = entries;
    }
}

impl ProcessTablePort for MockProcessTable {
    async fn processes(&self) -> Result<Vec<ProcessEntry>> {
        Ok(self.entries.read().clone())
    }
}

/// Mock connection table.
#[derive(Clone, Default)]
pub struct MockConnections {
    connections: Arc<RwLock<Vec<Connection>>>,
}

impl MockConnections {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections: Arc::new(RwLock::new(connections)),
        }
    }

    pub fn set(&self, connections: Vec<Connection>) {
        *self.connections.write() = connections;
    }
}

impl ConnectionTablePort for MockConnections {
    async fn established(&self) -> Result<Vec<Connection>> {
        Ok(self.connections.read().clone())
    }
}

pub fn connection(pid: u32, name: &str, port: u16) -> Connection {
    Connection {
        pid,
        process_name: name.to_string(),
        local_address: "192.168.1.5".to_string(),
        local_port: port,
    }
}

/// Packet filter that records reloads instead of touching pf.
#[derive(Clone, Default)]
pub struct RecordingFilter {
    reloads: Arc<Mutex<Vec<PathBuf>>>,
    fail: Arc<Mutex<bool>>,
    unprivileged: Arc<Mutex<bool>>,
}

impl RecordingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.lock().len()
    }

    pub fn fail_with_permission_denied(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn run_unprivileged(&self, unprivileged: bool) {
        *self.unprivileged.lock() = unprivileged;
    }
}

impl PacketFilterPort for RecordingFilter {
    fn ensure_privileged(&self) -> Result<()> {
        if *self.unprivileged.lock() {
            return Err(Error::PermissionDenied("changing pf rules requires root".to_string()));
        }
        Ok(())
    }

    async fn reload(&self, main_conf: &Path) -> Result<()> {
        if *self.fail.lock() {
            return Err(Error::PermissionDenied("pfctl: /dev/pf: Permission denied".to_string()));
        }
        self.reloads.lock().push(main_conf.to_path_buf());
        Ok(())
    }
}
