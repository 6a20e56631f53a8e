//! Application name to process identity resolution.

use crate::domain::{normalize, AppName, ProcessEntry, ProcessIdentity};
use crate::error::{Error, Result};
use crate::ports::ProcessTablePort;

/// Resolves an application name against the live process table.
///
/// Matching is by substring of the normalized process name. When several
/// processes match, an exact name match wins; otherwise the lowest pid wins,
/// so the outcome does not depend on the order the OS lists processes in.
pub struct ProcessResolver<P: ProcessTablePort> {
    table: P,
}

impl<P: ProcessTablePort> ProcessResolver<P> {
    pub fn new(table: P) -> Self {
        Self { table }
    }

    /// Snapshot of the whole process table.
    pub async fn entries(&self) -> Result<Vec<ProcessEntry>> {
        self.table.processes().await
    }

    /// All processes whose normalized name contains the application name, by ascending pid.
    pub async fn matches(&self, app: &AppName) -> Result<Vec<ProcessIdentity>> {
        let mut candidates: Vec<ProcessIdentity> = self
            .table
            .processes()
            .await?
            .iter()
            .filter(|p| normalize(&p.name).contains(app.matcher()))
            .map(ProcessIdentity::from)
            .collect();

        candidates.sort_by_key(|p| p.pid);
        Ok(candidates)
    }

    /// Resolve the application to a single process identity.
    pub async fn resolve(&self, app: &AppName) -> Result<ProcessIdentity> {
        let mut candidates = self.matches(app).await?;
        if candidates.is_empty() {
            return Err(Error::ProcessNotFound(app.matcher().to_string()));
        }

        if candidates.len() > 1 {
            let listed: Vec<String> = candidates
                .iter()
                .map(|p| format!("{}:{}", p.name, p.pid))
                .collect();
            tracing::warn!(
                "'{}' matches {} processes [{}], choosing by exact name then lowest pid",
                app.matcher(),
                candidates.len(),
                listed.join(", ")
            );
        }

        let index = candidates
            .iter()
            .position(|p| normalize(&p.name) == app.matcher())
            .unwrap_or(0);
        let chosen = candidates.swap_remove(index);

        tracing::debug!("Resolved '{}' to {}", app.matcher(), chosen);
        Ok(chosen)
    }

    /// Whether any process matches the application name.
    pub async fn is_running(&self, app: &AppName) -> Result<bool> {
        Ok(!self.matches(app).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProcessEntry;
    use crate::testing::MockProcessTable;

    fn resolver(entries: Vec<ProcessEntry>) -> ProcessResolver<MockProcessTable> {
        ProcessResolver::new(MockProcessTable::new(entries))
    }

    #[tokio::test]
    async fn test_resolve_by_substring() {
        let resolver = resolver(vec![
            ProcessEntry::new(1, 0, "launchd"),
            ProcessEntry::new(501, 501, "Google Chrome"),
        ]);

        let app = AppName::parse("chrome").unwrap();
        let identity = resolver.resolve(&app).await.unwrap();
        assert_eq!(identity.pid, 501);
        assert_eq!(identity.uid, 501);
    }

    #[tokio::test]
    async fn test_resolve_strips_bundle_suffix() {
        let resolver = resolver(vec![ProcessEntry::new(733, 501, "zoom.us")]);

        let app = AppName::parse("Zoom.app").unwrap();
        assert_eq!(resolver.resolve(&app).await.unwrap().pid, 733);
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let resolver = resolver(vec![ProcessEntry::new(1, 0, "launchd")]);

        let app = AppName::parse("slack").unwrap();
        let err = resolver.resolve(&app).await.unwrap_err();
        assert!(matches!(err, Error::ProcessNotFound(ref name) if name == "slack"));
    }

    #[tokio::test]
    async fn test_multi_match_prefers_lowest_pid() {
        // Listed out of pid order on purpose
        let resolver = resolver(vec![
            ProcessEntry::new(902, 501, "Google Chrome Helper"),
            ProcessEntry::new(640, 501, "Google Chrome Helper (GPU)"),
            ProcessEntry::new(871, 501, "Google Chrome Helper (Renderer)"),
        ]);

        let app = AppName::parse("chrome").unwrap();
        assert_eq!(resolver.resolve(&app).await.unwrap().pid, 640);

        let matches = resolver.matches(&app).await.unwrap();
        let pids: Vec<u32> = matches.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![640, 871, 902]);
    }

    #[tokio::test]
    async fn test_multi_match_prefers_exact_name() {
        let resolver = resolver(vec![
            ProcessEntry::new(300, 501, "Slack Helper"),
            ProcessEntry::new(412, 501, "Slack"),
        ]);

        let app = AppName::parse("slack").unwrap();
        assert_eq!(resolver.resolve(&app).await.unwrap().pid, 412);
    }

    #[tokio::test]
    async fn test_is_running() {
        let resolver = resolver(vec![ProcessEntry::new(10, 501, "firefox")]);

        assert!(resolver.is_running(&AppName::parse("Firefox").unwrap()).await.unwrap());
        assert!(!resolver.is_running(&AppName::parse("safari").unwrap()).await.unwrap());
    }
}
