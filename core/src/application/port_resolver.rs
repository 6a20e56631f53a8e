//! Process identity to local port set resolution.

use std::collections::BTreeMap;

use crate::domain::{NetworkProcess, PortSet, ProcessEntry};
use crate::error::Result;
use crate::ports::ConnectionTablePort;

/// Resolves the local ports a process holds through established connections.
pub struct PortResolver<C: ConnectionTablePort> {
    connections: C,
}

impl<C: ConnectionTablePort> PortResolver<C> {
    pub fn new(connections: C) -> Self {
        Self { connections }
    }

    /// Local ports of the established connections owned by `pid`.
    ///
    /// An empty set is a normal result: the process simply has no live
    /// connections yet, and callers fall back to a uid rule.
    pub async fn ports(&self, pid: u32) -> Result<PortSet> {
        let ports: PortSet = self
            .connections
            .established()
            .await?
            .iter()
            .filter(|c| c.pid == pid)
            .map(|c| c.local_port)
            .collect();

        tracing::debug!("pid {} holds ports {}", pid, ports);
        Ok(ports)
    }

    /// Every process holding at least one established connection.
    ///
    /// `processes` supplies owning uids; a pid missing from it (exited since
    /// the scan) is still listed, without a uid. Sorted by name, then pid.
    pub async fn network_processes(&self, processes: &[ProcessEntry]) -> Result<Vec<NetworkProcess>> {
        let mut by_pid: BTreeMap<u32, NetworkProcess> = BTreeMap::new();

        for conn in self.connections.established().await? {
            by_pid
                .entry(conn.pid)
                .or_insert_with(|| {
                    let entry = processes.iter().find(|p| p.pid == conn.pid);
                    NetworkProcess {
                        pid: conn.pid,
                        uid: entry.map(|p| p.uid),
                        name: conn.process_name.clone(),
                        ports: PortSet::new(),
                    }
                })
                .ports
                .insert(conn.local_port);
        }

        let mut list: Vec<NetworkProcess> = by_pid.into_values().collect();
        list.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.pid.cmp(&b.pid))
        });
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{connection, MockConnections};

    #[tokio::test]
    async fn test_ports_filters_by_pid_and_sorts() {
        let resolver = PortResolver::new(MockConnections::new(vec![
            connection(501, "chrome", 443),
            connection(733, "zoom", 8801),
            connection(501, "chrome", 80),
            connection(501, "chrome", 443),
        ]));

        let ports = resolver.ports(501).await.unwrap();
        assert_eq!(ports.iter().collect::<Vec<_>>(), vec![80, 443]);
    }

    #[tokio::test]
    async fn test_no_connections_is_empty_not_error() {
        let resolver = PortResolver::new(MockConnections::new(vec![connection(733, "zoom", 8801)]));

        let ports = resolver.ports(501).await.unwrap();
        assert!(ports.is_empty());
    }

    #[tokio::test]
    async fn test_network_processes_groups_by_pid() {
        let resolver = PortResolver::new(MockConnections::new(vec![
            connection(733, "zoom.us", 8801),
            connection(501, "Google Chrome", 443),
            connection(501, "Google Chrome", 52344),
            connection(999, "curl", 40000),
        ]));
        let processes = vec![
            ProcessEntry::new(501, 501, "Google Chrome"),
            ProcessEntry::new(733, 502, "zoom.us"),
        ];

        let list = resolver.network_processes(&processes).await.unwrap();
        let names: Vec<&str> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["curl", "Google Chrome", "zoom.us"]);

        assert_eq!(list[0].uid, None);
        assert_eq!(list[1].uid, Some(501));
        assert_eq!(list[1].ports.len(), 2);
        assert_eq!(list[2].uid, Some(502));
    }
}
