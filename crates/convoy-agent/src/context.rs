//! Agent runtime context.

use std::sync::Arc;

use crate::client::{CatalogClient, StatusReporter, StoreClient};
use crate::config::AgentConfig;
use crate::installer::Installer;
use crate::registry::LocalRegistry;
use crate::scheduler::SyncScheduler;
use crate::worker::{InstallWorker, WorkerHandle, WorkerOptions};

/// Owns the agent's shared state for the life of the process.
///
/// The scheduler/worker pair share the registry through this context rather
/// than through process globals.
pub struct AgentContext {
    config: AgentConfig,
    registry: Arc<LocalRegistry>,
}

impl AgentContext {
    pub fn new(config: AgentConfig) -> anyhow::Result<Self> {
        let registry = match &config.registry_path {
            Some(path) => LocalRegistry::load(path.clone())?,
            None => LocalRegistry::in_memory(),
        };
        Ok(Self {
            config,
            registry: Arc::new(registry),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<LocalRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn store_client(&self) -> anyhow::Result<StoreClient> {
        StoreClient::new(&self.config.store_url, self.config.request_timeout())
    }

    pub fn spawn_worker(
        &self,
        reporter: Arc<dyn StatusReporter>,
        installer: Arc<dyn Installer>,
    ) -> WorkerHandle {
        InstallWorker::spawn(
            reporter,
            installer,
            self.registry(),
            WorkerOptions {
                robot_id: self.config.robot_id.clone(),
                max_attempts: self.config.max_install_attempts,
                install_timeout: self.config.install_timeout(),
            },
        )
    }

    pub fn scheduler(&self, client: Arc<dyn CatalogClient>, worker: WorkerHandle) -> SyncScheduler {
        SyncScheduler::new(
            client,
            self.registry(),
            worker,
            self.config.robot_id.clone(),
            self.config.sync_interval(),
        )
    }
}
