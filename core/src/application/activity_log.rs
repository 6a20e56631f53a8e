//! Human-readable activity log of block/unblock actions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::fsutil;

/// Format one activity line: `timestamp | action | app | detail`.
pub fn format_record(at: DateTime<Local>, action: &str, app: Option<&str>, detail: Option<&str>) -> String {
    let mut line = format!("{} | {}", at.format("%Y-%m-%d %H:%M:%S"), action);
    if let Some(app) = app {
        line.push_str(" | ");
        line.push_str(app);
    }
    if let Some(detail) = detail {
        line.push_str(" | ");
        line.push_str(detail);
    }
    line
}

/// Append-only log at `~/.netcut/log.txt` by default.
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record stamped with the local time.
    pub async fn record(&self, action: &str, app: Option<&str>, detail: Option<&str>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fsutil::ensure_dir(parent).await?;
        }

        let line = format_record(Local::now(), action, app, detail);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::from_io(e, &self.path))?;
        file.write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(|e| Error::from_io(e, &self.path))?;
        Ok(())
    }

    /// The last `limit` records, oldest first.
    pub async fn read(&self, limit: usize) -> Result<Vec<String>> {
        let content = fsutil::read_optional(&self.path).await?.unwrap_or_default();
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let skip = lines.len().saturating_sub(limit);
        Ok(lines.into_iter().skip(skip).collect())
    }

    /// Delete the log. Returns whether it existed.
    pub async fn clear(&self) -> Result<bool> {
        fsutil::remove_if_exists(&self.path).await
    }
}
