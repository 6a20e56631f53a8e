//! Anchor registration in the main pf configuration.
//!
//! Each blocked application needs two lines in `pf.conf`:
//!
//! ```text
//! anchor "netcut_zoom"
//! load anchor "netcut_zoom" from "/etc/pf.anchors/netcut/zoom.conf"
//! ```
//!
//! The `anchor` declaration is added once and then left in place; with no
//! rules loaded into it, it matches nothing. The `load anchor` directive is
//! kept only while the anchor file exists, because pfctl rejects the whole
//! ruleset when a load directive points at a missing file.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fsutil::{self, FileLock};

/// Prefix of every anchor name this crate manages.
pub const ANCHOR_PREFIX: &str = "netcut_";

fn anchor_line(anchor: &str) -> String {
    format!("anchor \"{}\"", anchor)
}

fn load_prefix(anchor: &str) -> String {
    format!("load anchor \"{}\" from ", anchor)
}

fn load_line(anchor: &str, path: &Path) -> String {
    format!("{}\"{}\"", load_prefix(anchor), path.display())
}

/// Compute the configuration text after (un)registering an anchor.
///
/// Returns `None` when `conf` already has the requested shape, so repeated
/// calls never duplicate lines and never rewrite the file needlessly.
pub fn merge(conf: &str, anchor: &str, path: &Path, loaded: bool) -> Option<String> {
    let declaration = anchor_line(anchor);
    let prefix = load_prefix(anchor);
    let wanted_load = load_line(anchor, path);

    let mut changed = false;
    let mut has_declaration = false;
    let mut has_load = false;
    let mut lines: Vec<&str> = Vec::new();

    for line in conf.lines() {
        let trimmed = line.trim();
        if trimmed == declaration {
            if has_declaration {
                changed = true;
                continue;
            }
            has_declaration = true;
        } else if trimmed.starts_with(&prefix) {
            // Stale path, duplicate, or an unload request
            if !loaded || trimmed != wanted_load || has_load {
                changed = true;
                continue;
            }
            has_load = true;
        }
        lines.push(line);
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }

    if loaded && !has_declaration {
        out.push_str(&declaration);
        out.push('\n');
        changed = true;
    }
    if loaded && !has_load {
        out.push_str(&wanted_load);
        out.push('\n');
        changed = true;
    }

    changed.then_some(out)
}

/// Drop every managed `load anchor` directive, keeping declarations.
pub fn unload_all(conf: &str) -> Option<String> {
    let prefix = format!("load anchor \"{}", ANCHOR_PREFIX);
    if !conf.lines().any(|l| l.trim().starts_with(&prefix)) {
        return None;
    }

    let mut out: String = conf
        .lines()
        .filter(|l| !l.trim().starts_with(&prefix))
        .collect::<Vec<_>>()
        .join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Some(out)
}

/// The main pf configuration file, edited under an exclusive lock.
pub struct MainConfig {
    path: PathBuf,
    lock_path: PathBuf,
}

impl MainConfig {
    /// `lock_path` must be writable by the caller; it lives beside the anchors.
    pub fn new(path: PathBuf, lock_path: PathBuf) -> Self {
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register (or make inert) an anchor. Returns whether the file changed.
    pub async fn set_loaded(&self, anchor: &str, anchor_file: &Path, loaded: bool) -> Result<bool> {
        self.edit(|conf| merge(conf, anchor, anchor_file, loaded)).await
    }

    /// Make every managed anchor inert. Returns whether the file changed.
    pub async fn unload_all(&self) -> Result<bool> {
        self.edit(unload_all).await
    }

    async fn edit<F>(&self, apply: F) -> Result<bool>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if let Some(parent) = self.lock_path.parent() {
            fsutil::ensure_dir(parent).await?;
        }
        let _lock = FileLock::acquire(&self.lock_path).await?;

        let current = fsutil::read_optional(&self.path).await?.unwrap_or_default();
        match apply(&current) {
            Some(updated) => {
                fsutil::write_atomic(&self.path, updated.as_bytes()).await?;
                tracing::debug!("Updated anchor registration in {}", self.path.display());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
