//! Configuration management for paths, application groups and the allowlist.
//!
//! Stores configuration in JSON format at `~/.netcut/config.json`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::domain::normalize;
use crate::error::{Error, Result};
use crate::fsutil;

/// Configuration data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding one anchor file per blocked application.
    #[serde(default = "default_anchor_dir")]
    pub anchor_dir: PathBuf,

    /// Directory holding durable copies restored at boot.
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    /// Schedule log of pending unblocks.
    #[serde(default = "default_schedule_file")]
    pub schedule_file: PathBuf,

    /// Main pf configuration the anchors are registered in.
    #[serde(default = "default_pf_conf")]
    pub pf_conf: PathBuf,

    /// pfctl binary.
    #[serde(default = "default_pfctl")]
    pub pfctl: PathBuf,

    /// Interface used by the uid fallback rule.
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Human-readable activity log.
    #[serde(default = "default_activity_log")]
    pub activity_log: PathBuf,

    /// Named groups of applications, blocked together.
    #[serde(default = "default_groups")]
    pub groups: BTreeMap<String, Vec<String>>,

    /// Applications that must never be blocked.
    #[serde(default = "default_allowlist")]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub defaults: Defaults,
}

/// Defaults applied when the caller does not say otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    /// Duration such as `"10m"` applied when a block has no explicit duration.
    #[serde(default)]
    pub block_duration: Option<String>,

    /// Persist every block unless told otherwise.
    #[serde(default)]
    pub persistent_block: bool,
}

fn default_anchor_dir() -> PathBuf {
    PathBuf::from("/etc/pf.anchors/netcut")
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("/usr/local/etc/netcut/persistent")
}

fn default_schedule_file() -> PathBuf {
    PathBuf::from("/tmp/netcut_schedule.txt")
}

fn default_pf_conf() -> PathBuf {
    PathBuf::from("/etc/pf.conf")
}

fn default_pfctl() -> PathBuf {
    PathBuf::from("/sbin/pfctl")
}

fn default_interface() -> String {
    "en0".to_string()
}

fn default_activity_log() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".netcut").join("log.txt"),
        None => PathBuf::from("/tmp/netcut_log.txt"),
    }
}

fn default_groups() -> BTreeMap<String, Vec<String>> {
    let mut groups = BTreeMap::new();
    groups.insert(
        "browsers".to_string(),
        vec!["chrome".to_string(), "safari".to_string(), "firefox".to_string()],
    );
    groups.insert(
        "meetings".to_string(),
        vec!["zoom".to_string(), "teams".to_string()],
    );
    groups
}

fn default_allowlist() -> Vec<String> {
    vec!["system preferences".to_string(), "finder".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anchor_dir: default_anchor_dir(),
            persist_dir: default_persist_dir(),
            schedule_file: default_schedule_file(),
            pf_conf: default_pf_conf(),
            pfctl: default_pfctl(),
            interface: default_interface(),
            activity_log: default_activity_log(),
            groups: default_groups(),
            allowlist: default_allowlist(),
            defaults: Defaults::default(),
        }
    }
}

/// Paths and parameters every component is constructed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub anchor_dir: PathBuf,
    pub persist_dir: PathBuf,
    pub schedule_file: PathBuf,
    pub pf_conf: PathBuf,
    pub pfctl: PathBuf,
    pub interface: String,
    pub activity_log: PathBuf,
}

impl Config {
    pub fn settings(&self) -> Settings {
        Settings {
            anchor_dir: self.anchor_dir.clone(),
            persist_dir: self.persist_dir.clone(),
            schedule_file: self.schedule_file.clone(),
            pf_conf: self.pf_conf.clone(),
            pfctl: self.pfctl.clone(),
            interface: self.interface.clone(),
            activity_log: self.activity_log.clone(),
        }
    }

    /// Members of a group (case-insensitive group name).
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    /// Whether an application is on the allowlist.
    pub fn is_allowed(&self, app: &str) -> bool {
        let target = normalize(app);
        self.allowlist.iter().any(|a| normalize(a) == target)
    }

    /// Configuration rooted in a single directory.
    #[cfg(test)]
    pub(crate) fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            anchor_dir: root.join("anchors"),
            persist_dir: root.join("persistent"),
            schedule_file: root.join("schedule.txt"),
            pf_conf: root.join("pf.conf"),
            activity_log: root.join("log.txt"),
            ..Self::default()
        }
    }
}

/// Configuration store for managing netcut settings.
///
/// Handles reading and writing configuration to `~/.netcut/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.netcut/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".netcut").join("config.json"),
        })
    }

    /// Create a config store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &Config) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            fsutil::ensure_dir(config_dir).await?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fsutil::write_atomic(&self.config_path, content.as_bytes()).await
    }

    /// Write the default configuration if none exists yet.
    pub async fn ensure(&self) -> Result<Config> {
        let config = self.load().await?;
        if !self.config_path.exists() {
            self.save(&config).await?;
        }
        Ok(config)
    }

    /// Replace the members of a group. An empty member list deletes the group.
    pub async fn set_group(&self, name: &str, members: &[String]) -> Result<()> {
        let mut config = self.load().await?;
        let name = name.to_lowercase();
        if members.is_empty() {
            config.groups.remove(&name);
        } else {
            config.groups.insert(name, members.to_vec());
        }
        self.save(&config).await
    }

    /// Add an application to the allowlist.
    pub async fn allow(&self, app: &str) -> Result<()> {
        let mut config = self.load().await?;
        if config.is_allowed(app) {
            return Err(Error::Config(format!("'{}' is already allowlisted", app)));
        }
        config.allowlist.push(normalize(app));
        self.save(&config).await
    }

    /// Remove an application from the allowlist.
    pub async fn disallow(&self, app: &str) -> Result<()> {
        let mut config = self.load().await?;
        let target = normalize(app);
        config.allowlist.retain(|a| normalize(a) != target);
        self.save(&config).await
    }
}
