// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

/// Runtime settings. Every field has a default, so a config file only
/// needs the values it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Location of the dataset. Without it the network tier is skipped.
    pub dataset_url: Option<String>,
    /// Sent as the cache-busting query value; bump when the dataset changes.
    pub build_version: String,
    /// Directory for the durable snapshot.
    pub storage_dir: PathBuf,
    /// Skip the network tier even when a URL is configured.
    pub offline: bool,
    pub timeout_secs: u64,
    /// Interval between background reloads in interactive mode; 0 disables.
    pub refresh_interval_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_url: None,
            build_version: "v13".to_string(),
            storage_dir: PathBuf::from("storage"),
            offline: false,
            timeout_secs: 10,
            refresh_interval_secs: 30,
            user_agent: concat!("vinlookup/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Read a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Whether tier 1 (network) should be attempted.
    pub fn network_enabled(&self) -> bool {
        !self.offline && self.dataset_url.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}
