//! Schedule log of pending unblocks.
//!
//! The log is plain text, one `app,unblock_epoch` per line. [`ScheduleStore::check`]
//! is a compaction step, not a timer: it must be triggered externally (CLI,
//! launchd, or the CLI's daemon loop) and guarantees nothing between calls.

use std::path::PathBuf;

use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::domain::{AppName, ScheduleEntry};
use crate::error::{Error, Result};
use crate::fsutil::{self, FileLock};

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleCheck {
    /// Entries that expired and were dropped from the log.
    pub due: Vec<ScheduleEntry>,
    /// Entries written back.
    pub pending: Vec<ScheduleEntry>,
    /// Malformed lines skipped and dropped.
    pub corrupt: usize,
}

/// Append-then-compact log of scheduled unblocks.
pub struct ScheduleStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl ScheduleStore {
    pub fn new(path: PathBuf) -> Self {
        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self { path, lock_path }
    }

    /// Schedule `app` to be unblocked `duration_secs` after `now`.
    pub async fn add(&self, app: &AppName, duration_secs: u64, now: i64) -> Result<ScheduleEntry> {
        let offset = i64::try_from(duration_secs)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| Error::InvalidDuration(format!("{}s", duration_secs)))?;
        let unblock_at = now
            .checked_add(offset)
            .ok_or_else(|| Error::InvalidDuration(format!("{}s", duration_secs)))?;

        let entry = ScheduleEntry::new(app, unblock_at);
        self.append(std::slice::from_ref(&entry)).await?;

        tracing::info!("Scheduled unblock of {} at {}", app, unblock_at);
        Ok(entry)
    }

    /// Put entries back into the log unchanged, e.g. after a failed unblock.
    ///
    /// They keep their original time, so the next check picks them up again.
    pub async fn requeue(&self, entries: &[ScheduleEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.append(entries).await?;
        tracing::info!("Requeued {} scheduled unblock(s)", entries.len());
        Ok(())
    }

    /// Drop every pending entry for `app`. Returns how many were dropped.
    pub async fn cancel(&self, app: &AppName) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let _lock = FileLock::acquire(&self.lock_path).await?;

        let Some(content) = fsutil::read_optional(&self.path).await? else {
            return Ok(0);
        };
        let (entries, corrupt) = parse_log(&content);
        let (cancelled, kept): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|e| e.app == app.slug());

        if !cancelled.is_empty() || corrupt > 0 {
            let remainder: String = kept.iter().map(|e| format!("{}\n", e)).collect();
            fsutil::write_atomic(&self.path, remainder.as_bytes()).await?;
        }
        if !cancelled.is_empty() {
            tracing::info!("Cancelled {} scheduled unblock(s) of {}", cancelled.len(), app);
        }
        Ok(cancelled.len())
    }

    async fn append(&self, entries: &[ScheduleEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fsutil::ensure_dir(parent).await?;
        }
        let _lock = FileLock::acquire(&self.lock_path).await?;

        let lines: String = entries.iter().map(|e| format!("{}\n", e)).collect();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::from_io(e, &self.path))?;
        file.write_all(lines.as_bytes())
            .await
            .map_err(|e| Error::from_io(e, &self.path))?;
        file.sync_all()
            .await
            .map_err(|e| Error::from_io(e, &self.path))?;
        Ok(())
    }

    /// Drop every entry due at `now` and return it.
    ///
    /// Runs under an exclusive lock, so two concurrent checks never both
    /// return the same entry and never write back a stale remainder.
    pub async fn check(&self, now: i64) -> Result<ScheduleCheck> {
        if !self.path.exists() {
            return Ok(ScheduleCheck::default());
        }

        let _lock = FileLock::acquire(&self.lock_path).await?;

        let Some(content) = fsutil::read_optional(&self.path).await? else {
            return Ok(ScheduleCheck::default());
        };

        let (entries, corrupt) = parse_log(&content);
        let (due, pending): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.is_due(now));

        if !due.is_empty() || corrupt > 0 {
            let remainder: String = pending.iter().map(|e| format!("{}\n", e)).collect();
            fsutil::write_atomic(&self.path, remainder.as_bytes()).await?;
        }

        tracing::debug!(
            "Schedule check at {}: {} due, {} pending, {} corrupt",
            now,
            due.len(),
            pending.len(),
            corrupt
        );
        Ok(ScheduleCheck {
            due,
            pending,
            corrupt,
        })
    }

    /// Read-only view of the pending entries.
    pub async fn entries(&self) -> Result<Vec<ScheduleEntry>> {
        let content = fsutil::read_optional(&self.path).await?.unwrap_or_default();
        Ok(parse_log(&content).0)
    }
}

/// Parse a schedule log, skipping malformed lines.
fn parse_log(content: &str) -> (Vec<ScheduleEntry>, usize) {
    let mut entries = Vec::new();
    let mut corrupt = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match ScheduleEntry::parse_line(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("{}", e);
                corrupt += 1;
            }
        }
    }

    (entries, corrupt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn app(name: &str) -> AppName {
        AppName::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_add_appends_line() {
        let dir = tempdir().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.txt"));

        store.add(&app("zoom"), 10, 1_000).await.unwrap();
        store.add(&app("chrome"), 60, 1_000).await.unwrap();

        let content = std::fs::read_to_string(store.path.as_path()).unwrap();
        assert_eq!(content, "zoom,1010\nchrome,1060\n");
    }

    #[tokio::test]
    async fn test_add_rejects_zero_duration() {
        let dir = tempdir().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.txt"));

        let err = store.add(&app("zoom"), 0, 1_000).await.unwrap_err();
        assert!(matches!(err, Error::InvalidDuration(_)));
        assert!(!store.path.as_path().exists());
    }

    #[tokio::test]
    async fn test_check_partitions_by_due_time() {
        let dir = tempdir().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.txt"));
        let now = 1_000;

        store.add(&app("zoom"), 5, now).await.unwrap();

        let early = store.check(now + 1).await.unwrap();
        assert!(early.due.is_empty());
        assert_eq!(early.pending.len(), 1);

        let late = store.check(now + 6).await.unwrap();
        assert_eq!(late.due.len(), 1);
        assert_eq!(late.due[0].app, "zoom");
        assert!(late.pending.is_empty());

        // Each due entry is returned exactly once
        let again = store.check(now + 7).await.unwrap();
        assert!(again.due.is_empty());
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_missing_log() {
        let dir = tempdir().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.txt"));

        assert_eq!(store.check(1_000).await.unwrap(), ScheduleCheck::default());
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schedule.txt");
        std::fs::write(&path, "zoom,900\ngarbage\nchrome,notanumber\nslack,5000\n").unwrap();
        let store = ScheduleStore::new(path.clone());

        let check = store.check(1_000).await.unwrap();
        assert_eq!(check.corrupt, 2);
        assert_eq!(check.due.len(), 1);
        assert_eq!(check.due[0].app, "zoom");
        assert_eq!(check.pending.len(), 1);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "slack,5000\n");
    }

    #[tokio::test]
    async fn test_requeued_entry_is_due_again() {
        let dir = tempdir().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.txt"));
        store.add(&app("zoom"), 5, 1_000).await.unwrap();

        let first = store.check(1_010).await.unwrap();
        assert_eq!(first.due.len(), 1);
        store.requeue(&first.due).await.unwrap();

        let second = store.check(1_020).await.unwrap();
        assert_eq!(second.due, first.due);
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_drops_only_that_app() {
        let dir = tempdir().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.txt"));
        assert_eq!(store.cancel(&app("zoom")).await.unwrap(), 0);

        store.add(&app("zoom"), 10, 1_000).await.unwrap();
        store.add(&app("chrome"), 20, 1_000).await.unwrap();
        store.add(&app("zoom"), 30, 1_000).await.unwrap();

        assert_eq!(store.cancel(&app("Zoom.app")).await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(store.path.as_path()).unwrap(), "chrome,1020\n");
    }

    #[tokio::test]
    async fn test_concurrent_checks_return_entry_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schedule.txt");
        std::fs::write(&path, "zoom,900\nchrome,950\nslack,5000\n").unwrap();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let store = ScheduleStore::new(path.clone());
            handles.push(tokio::spawn(async move { store.check(1_000).await.unwrap() }));
        }

        let mut due = Vec::new();
        for handle in handles {
            due.extend(handle.await.unwrap().due);
        }
        due.sort_by(|a, b| a.app.cmp(&b.app));

        let apps: Vec<&str> = due.iter().map(|e| e.app.as_str()).collect();
        assert_eq!(apps, vec!["chrome", "zoom"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "slack,5000\n");
    }
}
