//! Store configuration, loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use convoy_core::escalation::DEFAULT_ESCALATION_THRESHOLD;
use convoy_core::types::Application;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: String,
    /// SQLite database path.
    pub db_path: PathBuf,
    /// Optional TOML file the catalog table is seeded from at startup.
    pub catalog_file: Option<PathBuf>,
    /// Failure count at which an alert is dispatched.
    pub escalation_threshold: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            db_path: PathBuf::from("convoy-store.db"),
            catalog_file: None,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
        }
    }
}

impl StoreConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}

/// Catalog seed file: a list of `[[apps]]` tables with snake_case keys.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub apps: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub app_id: String,
    pub name: String,
    pub version: String,
    pub url: String,
}

impl From<CatalogEntry> for Application {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            app_id: entry.app_id,
            name: entry.name,
            version: entry.version,
            url: entry.url,
        }
    }
}

impl CatalogFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
    }

    pub fn applications(self) -> Vec<Application> {
        self.apps.into_iter().map(Application::from).collect()
    }
}
