//! Publisher configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/assetlane/publisher.toml`
//! - Windows: `%APPDATA%/assetlane/publisher.toml`

use std::path::{Path, PathBuf};

use anyhow::Context;
use assetlane_platform::PlatformConfig;
use assetlane_protocol::{CategoryMap, EndpointCandidate};
use assetlane_publish::{EngineSettings, FinalizeSettings};
use serde::{Deserialize, Serialize};

/// Publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,

    /// Upload-initiation candidates, tried in order.
    #[serde(default)]
    pub candidates: Vec<EndpointCandidate>,

    /// Bound on each candidate attempt, in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    #[serde(default)]
    pub finalize: FinalizeSettings,

    /// Replaces the built-in category table when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<CategoryMap>,

    /// Linked-account file. Relative paths resolve against the config file.
    #[serde(default = "default_accounts_file")]
    pub accounts_file: PathBuf,
}

fn default_attempt_timeout_ms() -> u64 {
    EngineSettings::default().attempt_timeout_ms
}

fn default_accounts_file() -> PathBuf {
    PathBuf::from("accounts.toml")
}

impl Config {
    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;

        if config.accounts_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.accounts_file = dir.join(&config.accounts_file);
            }
        }

        tracing::debug!(
            path = %path.display(),
            candidates = config.candidates.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            candidates: self.candidates.clone(),
            attempt_timeout_ms: self.attempt_timeout_ms,
            finalize: self.finalize.clone(),
        }
    }

    pub fn category_map(&self) -> CategoryMap {
        self.categories.clone().unwrap_or_default()
    }
}

/// Returns the platform-specific configuration file path.
pub fn default_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("assetlane").join("publisher.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("assetlane")
            .join("publisher.toml")
    }
}
