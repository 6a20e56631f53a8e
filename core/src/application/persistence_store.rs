//! Durable copies of anchors that survive a restart.

use std::path::PathBuf;

use crate::domain::AppName;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::ports::PacketFilterPort;

use super::anchor_store::AnchorStore;

/// Mirror of selected anchors in a durable directory.
///
/// Entries have their own lifecycle: unblocking or expiring the live anchor
/// leaves the durable copy alone. Only [`clear`](Self::clear),
/// [`remove`](Self::remove) or a re-save changes it.
pub struct PersistenceStore {
    persist_dir: PathBuf,
}

impl PersistenceStore {
    pub fn new(persist_dir: PathBuf) -> Self {
        Self { persist_dir }
    }

    fn entry_path(&self, app: &AppName) -> PathBuf {
        self.persist_dir.join(app.file_name())
    }

    /// Copy the live anchor of `app` into the durable store.
    pub async fn save<F: PacketFilterPort>(
        &self,
        anchors: &AnchorStore<F>,
        app: &AppName,
    ) -> Result<()> {
        let text = anchors
            .read(app)
            .await?
            .ok_or_else(|| Error::AnchorNotFound(app.to_string()))?;

        fsutil::ensure_dir(&self.persist_dir).await?;
        fsutil::write_atomic(&self.entry_path(app), text.as_bytes()).await?;

        tracing::info!("Persisted block for {}", app);
        Ok(())
    }

    /// Recreate every persisted anchor and reload the filter once.
    pub async fn restore_all<F: PacketFilterPort>(
        &self,
        anchors: &AnchorStore<F>,
    ) -> Result<Vec<AppName>> {
        let apps = self.list().await?;

        for app in &apps {
            let Some(text) = fsutil::read_optional(&self.entry_path(app)).await? else {
                continue;
            };
            anchors.install(app, &text).await?;
        }
        anchors.reload().await?;

        tracing::info!("Restored {} persisted block(s)", apps.len());
        Ok(apps)
    }

    /// Applications with a durable entry, sorted.
    pub async fn list(&self) -> Result<Vec<AppName>> {
        let stems = fsutil::list_conf_files(&self.persist_dir).await?;
        Ok(stems
            .iter()
            .filter_map(|stem| AppName::parse(stem).ok())
            .collect())
    }

    /// Drop the durable entry of one application.
    pub async fn remove(&self, app: &AppName) -> Result<bool> {
        fsutil::remove_if_exists(&self.entry_path(app)).await
    }

    /// Drop every durable entry. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let apps = self.list().await?;
        for app in &apps {
            fsutil::remove_if_exists(&self.entry_path(app)).await?;
        }

        tracing::info!("Cleared {} persisted block(s)", apps.len());
        Ok(apps.len())
    }
}
