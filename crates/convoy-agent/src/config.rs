//! Agent configuration, loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::worker::DEFAULT_MAX_INSTALL_ATTEMPTS;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Identity this device reports under.
    pub robot_id: String,
    /// Base URL of the store.
    #[serde(default = "default_store_url")]
    pub store_url: String,
    /// Seconds between catalog sync passes.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Per-request timeout toward the store.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on a single install attempt.
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,
    /// Installer failures tolerated per app before it is abandoned.
    #[serde(default = "default_max_install_attempts")]
    pub max_install_attempts: u32,
    /// Where the installed-app registry persists; in-memory when unset.
    #[serde(default)]
    pub registry_path: Option<PathBuf>,
}

fn default_store_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_install_timeout_secs() -> u64 {
    600
}

fn default_max_install_attempts() -> u32 {
    DEFAULT_MAX_INSTALL_ATTEMPTS
}

impl AgentConfig {
    /// Defaults for everything except the robot identity.
    pub fn new(robot_id: impl Into<String>) -> Self {
        Self {
            robot_id: robot_id.into(),
            store_url: default_store_url(),
            sync_interval_secs: default_sync_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            install_timeout_secs: default_install_timeout_secs(),
            max_install_attempts: default_max_install_attempts(),
            registry_path: None,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}
