//! Netcut Engine - the operations the command line front end calls.
//!
//! The engine composes the resolvers and stores of the application layer:
//! `block` resolves a process, collects its ports, compiles rules and applies
//! an anchor; `unblock` removes it; `check_schedule` expires timed blocks.
//! Every mutating operation also appends a line to the activity log.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::adapters::{Pfctl, PsProcessTable, SystemConnections};
use crate::application::{
    ActivityLog, AnchorStore, PersistenceStore, PortResolver, ProcessResolver, ScheduleStore,
};
use crate::config::{Config, Settings};
use crate::domain::{compile, AppName, FirewallRule, NetworkProcess, PortSet, ProcessIdentity};
use crate::error::{Error, Result};
use crate::ports::{ConnectionTablePort, PacketFilterPort, ProcessTablePort};

/// Current Unix time in seconds.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// How a block should be applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOptions {
    /// Schedule an unblock this many seconds after the block.
    pub duration_secs: Option<u64>,
    /// Keep a durable copy restored by `load_persisted`.
    pub persist: bool,
    /// Compile and return the rules without touching anything.
    pub dry_run: bool,
}

/// What a block acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockOutcome {
    pub app: String,
    pub identity: ProcessIdentity,
    pub ports: PortSet,
    pub rules: Vec<FirewallRule>,
    /// No ports were found and the uid rule was used instead.
    pub fallback: bool,
    /// Rendered anchor text, only for dry runs.
    pub preview: Option<String>,
    pub persisted: bool,
    pub unblock_at: Option<i64>,
}

/// Per-member result of a group block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberOutcome {
    pub app: String,
    pub outcome: Option<BlockOutcome>,
    pub error: Option<String>,
}

/// State of one blocked or persisted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub app: String,
    /// A live anchor exists.
    pub active: bool,
    /// A durable copy exists.
    pub persisted: bool,
    /// Earliest pending scheduled unblock.
    pub unblock_at: Option<i64>,
    /// A matching process is currently running.
    pub running: bool,
}

/// Result of one schedule check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReport {
    /// Applications whose anchor was removed.
    pub unblocked: Vec<String>,
    /// Due entries with nothing left to remove.
    pub already_unblocked: Vec<String>,
    /// Entries still waiting.
    pub pending: usize,
    /// Malformed lines dropped from the log.
    pub corrupt: usize,
    /// Due entries whose removal failed, with the reason. They are put back
    /// into the log and retried by the next check.
    pub failed: Vec<(String, String)>,
}

/// Engine wired to the real `ps`, `lsof`/`ss` and `pfctl` adapters.
pub type SystemEngine = NetcutEngine<PsProcessTable, SystemConnections, Pfctl>;

/// The netcut engine.
pub struct NetcutEngine<P, C, F>
where
    P: ProcessTablePort,
    C: ConnectionTablePort,
    F: PacketFilterPort,
{
    settings: Settings,
    processes: ProcessResolver<P>,
    ports: PortResolver<C>,
    anchors: AnchorStore<F>,
    persisted: PersistenceStore,
    schedule: ScheduleStore,
    activity: ActivityLog,
    config: Config,
}

impl SystemEngine {
    /// Create an engine over the operating system.
    pub fn system(config: &Config) -> Self {
        let settings = config.settings();
        let filter = Pfctl::new(settings.pfctl.clone());
        Self::new(config, PsProcessTable::new(), SystemConnections::new(), filter)
    }
}

impl<P, C, F> NetcutEngine<P, C, F>
where
    P: ProcessTablePort,
    C: ConnectionTablePort,
    F: PacketFilterPort,
{
    pub fn new(config: &Config, process_table: P, connections: C, filter: F) -> Self {
        let settings = config.settings();
        Self {
            processes: ProcessResolver::new(process_table),
            ports: PortResolver::new(connections),
            anchors: AnchorStore::new(
                settings.anchor_dir.clone(),
                settings.pf_conf.clone(),
                filter,
            ),
            persisted: PersistenceStore::new(settings.persist_dir.clone()),
            schedule: ScheduleStore::new(settings.schedule_file.clone()),
            activity: ActivityLog::new(settings.activity_log.clone()),
            config: config.clone(),
            settings,
        }
    }

    /// Append to the activity log. Failures are logged, never returned.
    async fn note(&self, action: &str, app: Option<&str>, detail: Option<&str>) {
        if let Err(e) = self.activity.record(action, app, detail).await {
            tracing::warn!("Failed to write activity log {:?}: {}", self.activity.path(), e);
        }
    }

    /// Block an application's network access.
    pub async fn block(&self, name: &str, options: &BlockOptions, now: i64) -> Result<BlockOutcome> {
        let app = AppName::parse(name)?;
        if self.config.is_allowed(app.matcher()) {
            return Err(Error::Allowlisted(app.matcher().to_string()));
        }
        if options.duration_secs == Some(0) {
            return Err(Error::InvalidDuration("0s".to_string()));
        }
        if !options.dry_run {
            self.anchors.ensure_privileged()?;
        }

        let identity = self.processes.resolve(&app).await?;
        // Substring matching can land on an allowlisted process ("find" -> Finder)
        if self.config.is_allowed(&identity.name) {
            return Err(Error::Allowlisted(identity.name));
        }
        let ports = self.ports.ports(identity.pid).await?;
        let rules = compile(&ports, identity.uid, &self.settings.interface);
        let fallback = rules.iter().any(FirewallRule::is_fallback);
        if fallback {
            tracing::info!(
                "No established connections for {}, blocking uid {} on {}",
                identity,
                identity.uid,
                self.settings.interface
            );
        }

        let preview = self.anchors.apply(&app, &rules, options.dry_run).await?;
        let mut outcome = BlockOutcome {
            app: app.slug().to_string(),
            identity,
            ports,
            rules,
            fallback,
            preview,
            persisted: false,
            unblock_at: None,
        };
        if options.dry_run {
            return Ok(outcome);
        }

        if options.persist {
            self.persisted.save(&self.anchors, &app).await?;
            outcome.persisted = true;
        }
        // A new block replaces any earlier timer for the same app
        self.schedule.cancel(&app).await?;
        if let Some(secs) = options.duration_secs {
            let entry = self.schedule.add(&app, secs, now).await?;
            outcome.unblock_at = Some(entry.unblock_at);
        }

        let detail = match outcome.unblock_at {
            Some(at) => format!("pid {} ports {} until {}", outcome.identity.pid, outcome.ports, at),
            None => format!("pid {} ports {}", outcome.identity.pid, outcome.ports),
        };
        self.note("block", Some(app.slug()), Some(&detail)).await;
        Ok(outcome)
    }

    /// Block every member of a configured group.
    ///
    /// A member that fails (not running, allowlisted) does not stop the rest.
    pub async fn block_group(
        &self,
        group: &str,
        options: &BlockOptions,
        now: i64,
    ) -> Result<Vec<GroupMemberOutcome>> {
        let members = self
            .config
            .group(group)
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;

        let mut results = Vec::with_capacity(members.len());
        for member in members {
            let result = match self.block(member, options, now).await {
                Ok(outcome) => GroupMemberOutcome {
                    app: outcome.app.clone(),
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("Group '{}': could not block {}: {}", group, member, e);
                    GroupMemberOutcome {
                        app: member.clone(),
                        outcome: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    /// Remove an application's block. Returns `false` when it was not blocked.
    pub async fn unblock(&self, name: &str) -> Result<bool> {
        let app = AppName::parse(name)?;
        self.anchors.ensure_privileged()?;
        let removed = self.anchors.remove(&app).await?;
        if removed {
            self.note("unblock", Some(app.slug()), None).await;
        }
        Ok(removed)
    }

    /// Remove every block. Returns how many anchors were removed.
    pub async fn unblock_all(&self) -> Result<usize> {
        self.anchors.ensure_privileged()?;
        let count = self.anchors.remove_all().await?;
        self.note("unblock-all", None, Some(&format!("{} app(s)", count))).await;
        Ok(count)
    }

    /// Processes currently holding established connections.
    pub async fn list(&self) -> Result<Vec<NetworkProcess>> {
        let entries = self.processes.entries().await?;
        self.ports.network_processes(&entries).await
    }

    /// Blocked and persisted applications, sorted by name.
    pub async fn status(&self) -> Result<Vec<BlockStatus>> {
        let mut apps: BTreeMap<String, (AppName, bool, bool)> = BTreeMap::new();
        for app in self.anchors.list().await? {
            apps.insert(app.slug().to_string(), (app, true, false));
        }
        for app in self.persisted.list().await? {
            apps.entry(app.slug().to_string())
                .or_insert_with(|| (app, false, false))
                .2 = true;
        }

        let entries = self.schedule.entries().await?;
        let mut statuses = Vec::with_capacity(apps.len());
        for (slug, (app, active, persisted)) in apps {
            let unblock_at = entries
                .iter()
                .filter(|e| e.app == slug)
                .map(|e| e.unblock_at)
                .min();
            statuses.push(BlockStatus {
                running: self.processes.is_running(&app).await?,
                app: slug,
                active,
                persisted,
                unblock_at,
            });
        }
        Ok(statuses)
    }

    /// Write every active anchor into one file. Returns how many were exported.
    pub async fn export(&self, path: &Path) -> Result<usize> {
        let count = self.anchors.export(path).await?;
        self.note("export", None, Some(&path.display().to_string())).await;
        Ok(count)
    }

    /// Unblock every application whose scheduled time has passed.
    ///
    /// Due entries are taken out of the log before their anchors are removed.
    /// Entries whose removal fails are put back and retried on the next check.
    pub async fn check_schedule(&self, now: i64) -> Result<ScheduleReport> {
        let check = self.schedule.check(now).await?;
        if !check.due.is_empty() {
            if let Err(e) = self.anchors.ensure_privileged() {
                self.schedule.requeue(&check.due).await?;
                return Err(e);
            }
        }
        let mut report = ScheduleReport {
            pending: check.pending.len(),
            corrupt: check.corrupt,
            ..ScheduleReport::default()
        };

        let mut retry = Vec::new();
        for entry in check.due {
            let removed = match AppName::parse(&entry.app) {
                Ok(app) => self.anchors.remove(&app).await,
                Err(e) => Err(e),
            };
            match removed {
                Ok(true) => {
                    self.note("auto-unblock", Some(&entry.app), None).await;
                    report.unblocked.push(entry.app);
                }
                Ok(false) => report.already_unblocked.push(entry.app),
                Err(e) => {
                    tracing::warn!("Scheduled unblock of {} failed: {}", entry.app, e);
                    report.failed.push((entry.app.clone(), e.to_string()));
                    retry.push(entry);
                }
            }
        }
        self.schedule.requeue(&retry).await?;

        if !report.unblocked.is_empty() {
            tracing::info!("Schedule check unblocked {}", report.unblocked.join(", "));
        }
        Ok(report)
    }

    /// Recreate every persisted block.
    pub async fn load_persisted(&self) -> Result<Vec<String>> {
        self.anchors.ensure_privileged()?;
        let apps = self.persisted.restore_all(&self.anchors).await?;
        let names: Vec<String> = apps.iter().map(|a| a.slug().to_string()).collect();
        self.note("load-persisted", None, Some(&format!("{} app(s)", names.len()))).await;
        Ok(names)
    }

    /// Keep a durable copy of an application's live block.
    pub async fn persist(&self, name: &str) -> Result<()> {
        let app = AppName::parse(name)?;
        self.anchors.ensure_privileged()?;
        self.persisted.save(&self.anchors, &app).await?;
        self.note("persist", Some(app.slug()), None).await;
        Ok(())
    }

    /// Drop one durable copy. Returns `false` when there was none.
    pub async fn unpersist(&self, name: &str) -> Result<bool> {
        let app = AppName::parse(name)?;
        self.anchors.ensure_privileged()?;
        let removed = self.persisted.remove(&app).await?;
        if removed {
            self.note("unpersist", Some(app.slug()), None).await;
        }
        Ok(removed)
    }

    /// Drop every durable copy. Active anchors are untouched.
    pub async fn clear_persisted(&self) -> Result<usize> {
        self.anchors.ensure_privileged()?;
        let count = self.persisted.clear().await?;
        self.note("clear-persisted", None, Some(&format!("{} app(s)", count))).await;
        Ok(count)
    }

    /// The last `limit` activity records.
    pub async fn activity(&self, limit: usize) -> Result<Vec<String>> {
        self.activity.read(limit).await
    }

    pub async fn clear_activity(&self) -> Result<bool> {
        self.activity.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProcessEntry;
    use crate::testing::{connection, MockConnections, MockProcessTable, RecordingFilter};
    use tempfile::{tempdir, TempDir};

    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        engine: NetcutEngine<MockProcessTable, MockConnections, RecordingFilter>,
        processes: MockProcessTable,
        connections: MockConnections,
        filter: RecordingFilter,
        config: Config,
        dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let config = Config::rooted_at(dir.path());

        let processes = MockProcessTable::new(vec![
            ProcessEntry::new(1, 0, "launchd"),
            ProcessEntry::new(501, 501, "Google Chrome"),
            ProcessEntry::new(777, 501, "zoom.us"),
            ProcessEntry::new(900, 501, "Finder"),
        ]);
        let connections = MockConnections::new(vec![
            connection(501, "Google Chrome", 443),
            connection(501, "Google Chrome", 80),
            connection(501, "Google Chrome", 443),
        ]);
        let filter = RecordingFilter::new();

        let engine = NetcutEngine::new(&config, processes.clone(), connections.clone(), filter.clone());
        Fixture {
            engine,
            processes,
            connections,
            filter,
            config,
            dir,
        }
    }

    fn anchor_text(fx: &Fixture, slug: &str) -> Option<String> {
        std::fs::read_to_string(fx.config.anchor_dir.join(format!("{}.conf", slug))).ok()
    }

    #[tokio::test]
    async fn test_block_with_ports() {
        let fx = fixture();
        let outcome = fx
            .engine
            .block("chrome", &BlockOptions::default(), NOW)
            .await
            .unwrap();

        assert_eq!(outcome.identity.pid, 501);
        assert_eq!(outcome.ports.iter().collect::<Vec<_>>(), vec![80, 443]);
        assert_eq!(outcome.rules.len(), 4);
        assert!(!outcome.fallback);
        assert!(outcome.preview.is_none());

        assert_eq!(
            anchor_text(&fx, "chrome").unwrap(),
            "block drop out proto tcp from any port 80 to any\n\
             block drop out proto udp from any port 80 to any\n\
             block drop out proto tcp from any port 443 to any\n\
             block drop out proto udp from any port 443 to any\n"
        );
        assert_eq!(fx.filter.reload_count(), 1);

        let pf_conf = std::fs::read_to_string(&fx.config.pf_conf).unwrap();
        assert!(pf_conf.contains("anchor \"netcut_chrome\""));
    }

    #[tokio::test]
    async fn test_block_without_ports_uses_uid_fallback() {
        let fx = fixture();
        let outcome = fx
            .engine
            .block("zoom", &BlockOptions::default(), NOW)
            .await
            .unwrap();

        assert!(outcome.fallback);
        assert_eq!(outcome.rules.len(), 1);
        assert_eq!(
            anchor_text(&fx, "zoom").unwrap(),
            "block drop log out quick on en0 user 501 to any\n"
        );
    }

    #[tokio::test]
    async fn test_block_unknown_process_touches_nothing() {
        let fx = fixture();
        let err = fx
            .engine
            .block("slack", &BlockOptions::default(), NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProcessNotFound(_)));
        assert!(anchor_text(&fx, "slack").is_none());
        assert!(!fx.config.pf_conf.exists());
        assert_eq!(fx.filter.reload_count(), 0);
    }

    #[tokio::test]
    async fn test_block_refuses_allowlisted() {
        let fx = fixture();
        let err = fx
            .engine
            .block("Finder.app", &BlockOptions::default(), NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Allowlisted(_)));
        assert_eq!(fx.filter.reload_count(), 0);
    }

    #[tokio::test]
    async fn test_block_refuses_allowlisted_process_behind_partial_name() {
        let fx = fixture();
        let err = fx
            .engine
            .block("find", &BlockOptions::default(), NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Allowlisted(ref name) if name == "Finder"));
        assert!(anchor_text(&fx, "find").is_none());
        assert_eq!(fx.filter.reload_count(), 0);
    }

    #[tokio::test]
    async fn test_block_rejects_zero_duration() {
        let fx = fixture();
        let options = BlockOptions {
            duration_secs: Some(0),
            ..BlockOptions::default()
        };
        let err = fx.engine.block("chrome", &options, NOW).await.unwrap_err();

        assert!(matches!(err, Error::InvalidDuration(_)));
        assert!(anchor_text(&fx, "chrome").is_none());
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let fx = fixture();
        let options = BlockOptions {
            duration_secs: Some(60),
            persist: true,
            dry_run: true,
        };
        let outcome = fx.engine.block("chrome", &options, NOW).await.unwrap();

        assert_eq!(outcome.preview.as_deref().map(|t| t.lines().count()), Some(4));
        assert!(!outcome.persisted);
        assert!(outcome.unblock_at.is_none());
        assert!(!fx.config.anchor_dir.exists());
        assert!(!fx.config.persist_dir.exists());
        assert!(!fx.config.schedule_file.exists());
        assert_eq!(fx.filter.reload_count(), 0);
    }

    #[tokio::test]
    async fn test_timed_block_expires() {
        let fx = fixture();
        let options = BlockOptions {
            duration_secs: Some(10),
            ..BlockOptions::default()
        };
        let outcome = fx.engine.block("zoom", &options, NOW).await.unwrap();
        assert_eq!(outcome.unblock_at, Some(NOW + 10));

        let report = fx.engine.check_schedule(NOW + 3).await.unwrap();
        assert!(report.unblocked.is_empty());
        assert_eq!(report.pending, 1);
        assert!(anchor_text(&fx, "zoom").is_some());

        let report = fx.engine.check_schedule(NOW + 11).await.unwrap();
        assert_eq!(report.unblocked, vec!["zoom".to_string()]);
        assert_eq!(report.pending, 0);
        assert!(anchor_text(&fx, "zoom").is_none());

        let report = fx.engine.check_schedule(NOW + 20).await.unwrap();
        assert_eq!(report, ScheduleReport::default());
    }

    #[tokio::test]
    async fn test_expiry_after_manual_unblock_is_noop() {
        let fx = fixture();
        let options = BlockOptions {
            duration_secs: Some(5),
            ..BlockOptions::default()
        };
        fx.engine.block("chrome", &options, NOW).await.unwrap();
        assert!(fx.engine.unblock("chrome").await.unwrap());
        let reloads = fx.filter.reload_count();

        let report = fx.engine.check_schedule(NOW + 5).await.unwrap();
        assert!(report.unblocked.is_empty());
        assert_eq!(report.already_unblocked, vec!["chrome".to_string()]);
        assert_eq!(fx.filter.reload_count(), reloads);
    }

    #[tokio::test]
    async fn test_permanent_reblock_cancels_timer() {
        let fx = fixture();
        let timed = BlockOptions {
            duration_secs: Some(10),
            ..BlockOptions::default()
        };
        fx.engine.block("zoom", &timed, NOW).await.unwrap();
        fx.engine.block("zoom", &BlockOptions::default(), NOW + 1).await.unwrap();

        let report = fx.engine.check_schedule(NOW + 11).await.unwrap();
        assert!(report.unblocked.is_empty());
        assert!(anchor_text(&fx, "zoom").is_some());
    }

    #[tokio::test]
    async fn test_failed_scheduled_unblock_is_retried() {
        let fx = fixture();
        let timed = BlockOptions {
            duration_secs: Some(10),
            ..BlockOptions::default()
        };
        fx.engine.block("zoom", &timed, NOW).await.unwrap();

        fx.filter.fail_with_permission_denied(true);
        let report = fx.engine.check_schedule(NOW + 11).await.unwrap();
        assert!(report.unblocked.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "zoom");
        assert!(anchor_text(&fx, "zoom").is_some());

        fx.filter.fail_with_permission_denied(false);
        let report = fx.engine.check_schedule(NOW + 12).await.unwrap();
        assert_eq!(report.unblocked, vec!["zoom".to_string()]);
        assert!(report.failed.is_empty());
        assert!(anchor_text(&fx, "zoom").is_none());
    }

    #[tokio::test]
    async fn test_unblock_not_blocked() {
        let fx = fixture();
        assert!(!fx.engine.unblock("chrome").await.unwrap());
        assert_eq!(fx.filter.reload_count(), 0);
    }

    #[tokio::test]
    async fn test_reblock_overwrites_with_current_ports() {
        let fx = fixture();
        fx.engine.block("chrome", &BlockOptions::default(), NOW).await.unwrap();

        fx.connections.set(vec![connection(501, "Google Chrome", 8443)]);
        fx.engine.block("chrome", &BlockOptions::default(), NOW).await.unwrap();

        let text = anchor_text(&fx, "chrome").unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("port 8443"));

        let pf_conf = std::fs::read_to_string(&fx.config.pf_conf).unwrap();
        assert_eq!(pf_conf.matches("anchor \"netcut_chrome\"\n").count(), 1);
    }

    #[tokio::test]
    async fn test_block_resolves_fresh_identity() {
        let fx = fixture();
        fx.engine.block("zoom", &BlockOptions::default(), NOW).await.unwrap();

        fx.processes.set(vec![ProcessEntry::new(4242, 502, "zoom.us")]);
        let outcome = fx
            .engine
            .block("zoom", &BlockOptions::default(), NOW)
            .await
            .unwrap();
        assert_eq!(outcome.identity.pid, 4242);
        assert!(anchor_text(&fx, "zoom").unwrap().contains("user 502"));
    }

    #[tokio::test]
    async fn test_block_group_reports_each_member() {
        let fx = fixture();
        let results = fx
            .engine
            .block_group("Browsers", &BlockOptions::default(), NOW)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].app, "chrome");
        assert!(results[0].outcome.is_some());
        assert!(results[1].error.is_some());
        assert!(results[2].error.is_some());

        let err = fx
            .engine
            .block_group("nope", &BlockOptions::default(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownGroup(_)));
    }

    #[tokio::test]
    async fn test_persist_and_restore() {
        let fx = fixture();
        let options = BlockOptions {
            persist: true,
            ..BlockOptions::default()
        };
        assert!(fx.engine.block("chrome", &options, NOW).await.unwrap().persisted);

        assert!(fx.engine.unblock("chrome").await.unwrap());
        assert!(anchor_text(&fx, "chrome").is_none());

        let restored = fx.engine.load_persisted().await.unwrap();
        assert_eq!(restored, vec!["chrome".to_string()]);
        assert_eq!(anchor_text(&fx, "chrome").unwrap().lines().count(), 4);

        assert_eq!(fx.engine.clear_persisted().await.unwrap(), 1);
        assert!(anchor_text(&fx, "chrome").is_some());
        assert!(fx.engine.load_persisted().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unpersist_keeps_active_block() {
        let fx = fixture();
        let options = BlockOptions {
            persist: true,
            ..BlockOptions::default()
        };
        fx.engine.block("chrome", &options, NOW).await.unwrap();

        assert!(fx.engine.unpersist("chrome").await.unwrap());
        assert!(!fx.engine.unpersist("chrome").await.unwrap());
        assert!(anchor_text(&fx, "chrome").is_some());
        assert!(fx.engine.load_persisted().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_requires_live_anchor() {
        let fx = fixture();
        let err = fx.engine.persist("chrome").await.unwrap_err();
        assert!(matches!(err, Error::AnchorNotFound(_)));
    }

    #[tokio::test]
    async fn test_unblock_all_and_status() {
        let fx = fixture();
        let timed = BlockOptions {
            duration_secs: Some(600),
            ..BlockOptions::default()
        };
        fx.engine.block("chrome", &timed, NOW).await.unwrap();
        fx.engine.block("zoom", &BlockOptions::default(), NOW).await.unwrap();
        fx.engine.persist("zoom").await.unwrap();

        let status = fx.engine.status().await.unwrap();
        assert_eq!(
            status,
            vec![
                BlockStatus {
                    app: "chrome".to_string(),
                    active: true,
                    persisted: false,
                    unblock_at: Some(NOW + 600),
                    running: true,
                },
                BlockStatus {
                    app: "zoom".to_string(),
                    active: true,
                    persisted: true,
                    unblock_at: None,
                    running: true,
                },
            ]
        );

        assert_eq!(fx.engine.unblock_all().await.unwrap(), 2);
        let status = fx.engine.status().await.unwrap();
        assert_eq!(status.len(), 1);
        assert!(!status[0].active);
        assert!(status[0].persisted);

        assert_eq!(fx.engine.unblock_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_export() {
        let fx = fixture();
        fx.engine.block("chrome", &BlockOptions::default(), NOW).await.unwrap();
        fx.engine.block("zoom", &BlockOptions::default(), NOW).await.unwrap();

        let out = fx.dir.path().join("rules.conf");
        assert_eq!(fx.engine.export(&out).await.unwrap(), 2);

        let text = std::fs::read_to_string(&out).unwrap();
        let chrome = text.find("# chrome").unwrap();
        let zoom = text.find("# zoom").unwrap();
        assert!(chrome < zoom);
    }

    #[tokio::test]
    async fn test_list_network_processes() {
        let fx = fixture();
        let list = fx.engine.list().await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].pid, 501);
        assert_eq!(list[0].uid, Some(501));
        assert_eq!(list[0].ports.len(), 2);
    }

    #[tokio::test]
    async fn test_activity_is_recorded() {
        let fx = fixture();
        fx.engine.block("chrome", &BlockOptions::default(), NOW).await.unwrap();
        fx.engine.unblock("chrome").await.unwrap();

        let records = fx.engine.activity(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].contains(" | block | chrome | pid 501"));
        assert!(records[1].contains(" | unblock | chrome"));

        assert!(fx.engine.clear_activity().await.unwrap());
        assert!(fx.engine.activity(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reload_failure_surfaces() {
        let fx = fixture();
        fx.filter.fail_with_permission_denied(true);

        let err = fx
            .engine
            .block("chrome", &BlockOptions::default(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_unprivileged_block_writes_nothing() {
        let fx = fixture();
        fx.filter.run_unprivileged(true);

        let err = fx
            .engine
            .block("nonexistent", &BlockOptions::default(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert!(!fx.config.anchor_dir.exists());
        assert!(!fx.config.pf_conf.exists());
        assert!(!fx.config.schedule_file.exists());

        let dry_run = BlockOptions {
            dry_run: true,
            ..BlockOptions::default()
        };
        let outcome = fx.engine.block("chrome", &dry_run, NOW).await.unwrap();
        assert!(outcome.preview.is_some());
    }

    #[tokio::test]
    async fn test_unprivileged_unblock_keeps_anchor() {
        let fx = fixture();
        let timed = BlockOptions {
            duration_secs: Some(10),
            ..BlockOptions::default()
        };
        fx.engine.block("zoom", &timed, NOW).await.unwrap();
        fx.filter.run_unprivileged(true);

        assert!(matches!(
            fx.engine.unblock("zoom").await.unwrap_err(),
            Error::PermissionDenied(_)
        ));
        assert!(matches!(
            fx.engine.check_schedule(NOW + 11).await.unwrap_err(),
            Error::PermissionDenied(_)
        ));
        assert!(anchor_text(&fx, "zoom").is_some());

        fx.filter.run_unprivileged(false);
        let report = fx.engine.check_schedule(NOW + 12).await.unwrap();
        assert_eq!(report.unblocked, vec!["zoom".to_string()]);
    }
}
