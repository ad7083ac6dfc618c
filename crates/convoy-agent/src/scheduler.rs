//! Periodic catalog sync.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::CatalogClient;
use crate::registry::LocalRegistry;
use crate::worker::WorkerHandle;

/// Asks the store what the robot still needs and feeds the install worker.
///
/// Runs one pass at startup, then on a fixed period. Passes are not
/// mutually exclusive with in-flight installs; enqueueing an app that is
/// already mid-install is tolerated, since installers treat re-installing a
/// current version as a no-op.
pub struct SyncScheduler {
    client: Arc<dyn CatalogClient>,
    registry: Arc<LocalRegistry>,
    worker: WorkerHandle,
    robot_id: String,
    period: Duration,
}

impl SyncScheduler {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        registry: Arc<LocalRegistry>,
        worker: WorkerHandle,
        robot_id: String,
        period: Duration,
    ) -> Self {
        Self {
            client,
            registry,
            worker,
            robot_id,
            period,
        }
    }

    /// Sync forever; the first tick fires immediately.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.period);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One sync pass. A failed RPC ends the pass; the next tick runs
    /// normally.
    pub async fn run_once(&self) {
        let installed = self.registry.snapshot();
        debug!(robot_id = %self.robot_id, installed = installed.len(), "sync pass");

        match self.client.fetch_apps(&self.robot_id, &installed).await {
            Ok(apps) => {
                if !apps.is_empty() {
                    info!(robot_id = %self.robot_id, count = apps.len(), "apps scheduled for install");
                }
                for app in apps {
                    self.worker.enqueue(app);
                }
            }
            Err(err) => warn!(robot_id = %self.robot_id, "catalog sync failed: {err:#}"),
        }
    }
}
