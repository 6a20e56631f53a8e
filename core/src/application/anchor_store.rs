//! On-disk pf anchors: apply, remove, export and reload.

use std::path::{Path, PathBuf};

use crate::domain::{render, AppName, FirewallRule};
use crate::error::Result;
use crate::fsutil;
use crate::ports::PacketFilterPort;

use super::registration::MainConfig;

/// Owns the anchor directory and drives filter reloads.
///
/// Every blocked application has exactly one file, `<anchor_dir>/<slug>.conf`;
/// applying again overwrites it.
pub struct AnchorStore<F: PacketFilterPort> {
    anchor_dir: PathBuf,
    main_config: MainConfig,
    filter: F,
}

impl<F: PacketFilterPort> AnchorStore<F> {
    pub fn new(anchor_dir: PathBuf, pf_conf: PathBuf, filter: F) -> Self {
        let lock_path = anchor_dir.join(".registration.lock");
        Self {
            anchor_dir,
            main_config: MainConfig::new(pf_conf, lock_path),
            filter,
        }
    }

    /// Path of the anchor file for an application.
    pub fn anchor_path(&self, app: &AppName) -> PathBuf {
        self.anchor_dir.join(app.file_name())
    }

    /// Apply rules for an application.
    ///
    /// With `dry_run`, returns the rule text without touching disk or the
    /// filter. Otherwise the anchor file is replaced, registered and the
    /// filter reloaded; any failure before the reload aborts it.
    pub async fn apply(
        &self,
        app: &AppName,
        rules: &[FirewallRule],
        dry_run: bool,
    ) -> Result<Option<String>> {
        let text = render(rules);
        if dry_run {
            return Ok(Some(text));
        }

        self.install(app, &text).await?;
        self.reload().await?;

        tracing::info!("Applied {} rule(s) for {}", rules.len(), app);
        Ok(None)
    }

    /// Write and register an anchor without reloading.
    ///
    /// Used to batch several installs behind a single reload. If registration
    /// fails, the anchor file is put back the way it was before the call.
    pub async fn install(&self, app: &AppName, text: &str) -> Result<()> {
        fsutil::ensure_dir(&self.anchor_dir).await?;

        let path = self.anchor_path(app);
        let previous = fsutil::read_optional(&path).await?;
        fsutil::write_atomic(&path, text.as_bytes()).await?;

        if let Err(e) = self
            .main_config
            .set_loaded(&app.anchor_name(), &path, true)
            .await
        {
            let restored = match &previous {
                Some(old) => fsutil::write_atomic(&path, old.as_bytes()).await,
                None => fsutil::remove_if_exists(&path).await.map(|_| ()),
            };
            if let Err(restore_err) = restored {
                tracing::warn!("Could not roll back {}: {}", path.display(), restore_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove an application's anchor.
    ///
    /// Returns `false` (and does not reload) when nothing was blocked. The
    /// `load anchor` directive goes before the file does, so the main
    /// configuration never points at a missing anchor.
    ///
    /// If the reload fails, the anchor is reinstalled so disk keeps matching
    /// the rules pf still enforces and the removal can be retried.
    pub async fn remove(&self, app: &AppName) -> Result<bool> {
        let path = self.anchor_path(app);
        let previous = fsutil::read_optional(&path).await?;

        let unregistered = if self.main_config.path().exists() {
            self.main_config
                .set_loaded(&app.anchor_name(), &path, false)
                .await?
        } else {
            false
        };
        let removed = fsutil::remove_if_exists(&path).await?;

        if removed || unregistered {
            if let Err(e) = self.reload().await {
                if let Some(text) = &previous {
                    if let Err(restore_err) = self.install(app, text).await {
                        tracing::warn!("Could not reinstall anchor for {}: {}", app, restore_err);
                    }
                }
                return Err(e);
            }
        }

        if removed {
            tracing::info!("Removed anchor for {}", app);
        } else {
            tracing::debug!("No anchor for {}", app);
        }
        Ok(removed)
    }

    /// Remove every anchor, reloading once. Returns how many were removed.
    pub async fn remove_all(&self) -> Result<usize> {
        let apps = self.list().await?;

        let unregistered = if self.main_config.path().exists() {
            self.main_config.unload_all().await?
        } else {
            false
        };
        for app in &apps {
            fsutil::remove_if_exists(&self.anchor_path(app)).await?;
        }

        if !apps.is_empty() || unregistered {
            self.reload().await?;
        }

        tracing::info!("Removed {} anchor(s)", apps.len());
        Ok(apps.len())
    }

    /// Applications with a live anchor, sorted.
    pub async fn list(&self) -> Result<Vec<AppName>> {
        let stems = fsutil::list_conf_files(&self.anchor_dir).await?;
        Ok(stems
            .iter()
            .filter_map(|stem| match AppName::parse(stem) {
                Ok(app) => Some(app),
                Err(e) => {
                    tracing::warn!("Ignoring foreign anchor file '{}.conf': {}", stem, e);
                    None
                }
            })
            .collect())
    }

    /// Current rule text of an application's anchor.
    pub async fn read(&self, app: &AppName) -> Result<Option<String>> {
        fsutil::read_optional(&self.anchor_path(app)).await
    }

    /// Write every anchor into one file, each preceded by `# <app>`.
    ///
    /// Returns the number of anchors exported.
    pub async fn export(&self, path: &Path) -> Result<usize> {
        let apps = self.list().await?;
        let mut out = String::new();

        for app in &apps {
            let Some(text) = self.read(app).await? else {
                continue;
            };
            out.push_str(&format!("# {}\n", app));
            out.push_str(&text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }

        fsutil::write_atomic(path, out.as_bytes()).await?;
        tracing::info!("Exported {} anchor(s) to {}", apps.len(), path.display());
        Ok(apps.len())
    }

    /// Fail early when this process is not allowed to change the filter.
    pub fn ensure_privileged(&self) -> Result<()> {
        self.filter.ensure_privileged()
    }

    /// Reload the live filter from the main configuration.
    pub async fn reload(&self) -> Result<()> {
        self.filter.reload(self.main_config.path()).await
    }
}
