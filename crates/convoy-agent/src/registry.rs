//! Local installed-app registry.
//!
//! One instance is shared by the scheduler and the worker for the life of
//! the process. The map persists to a JSON file (atomic tmp + rename) so a
//! restarted agent does not re-install what it already holds; persistence
//! failures are logged and the in-memory map stays authoritative.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use convoy_core::types::InstalledAppRef;
use tracing::warn;

#[derive(Debug)]
pub struct LocalRegistry {
    inner: Mutex<BTreeMap<String, String>>,
    path: Option<PathBuf>,
}

impl LocalRegistry {
    /// Registry without persistence.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
            path: None,
        }
    }

    /// Load the registry from `path`, starting empty if the file does not
    /// exist yet.
    pub fn load(path: PathBuf) -> anyhow::Result<Self> {
        let installed = if path.exists() {
            let raw = fs::read(&path)
                .with_context(|| format!("Failed to read registry: {}", path.display()))?;
            serde_json::from_slice(&raw)
                .with_context(|| format!("Failed to parse registry: {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            inner: Mutex::new(installed),
            path: Some(path),
        })
    }

    /// Current holdings as (app_id, version) pairs, ordered by app id.
    pub fn snapshot(&self) -> Vec<InstalledAppRef> {
        self.inner
            .lock()
            .expect("registry mutex poisoned")
            .iter()
            .map(|(app_id, version)| InstalledAppRef {
                app_id: app_id.clone(),
                version: version.clone(),
            })
            .collect()
    }

    pub fn installed_version(&self, app_id: &str) -> Option<String> {
        self.inner
            .lock()
            .expect("registry mutex poisoned")
            .get(app_id)
            .cloned()
    }

    /// Record a confirmed install and persist the registry best-effort.
    pub fn set(&self, app_id: &str, version: &str) {
        let snapshot = {
            let mut installed = self.inner.lock().expect("registry mutex poisoned");
            installed.insert(app_id.to_string(), version.to_string());
            installed.clone()
        };

        if let Err(err) = self.persist(&snapshot) {
            warn!(app_id, version, "failed to persist registry: {err:#}");
        }
    }

    fn persist(&self, installed: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let bytes = serde_json::to_vec_pretty(installed).context("Failed to encode registry")?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}
