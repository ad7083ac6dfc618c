//! Catalog service: what a robot still needs, plus SCHEDULED tracking.

use std::sync::Arc;

use chrono::Utc;
use convoy_core::catalog::apps_needing_install;
use convoy_core::error::Error;
use convoy_core::protocol::StateUpdate;
use convoy_core::types::{Application, InstalledAppRef};
use tracing::{debug, warn};

use crate::db::Database;
use crate::state::StateService;

/// Serves the catalog diff for a robot and records the handoff.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<Database>,
    state: StateService,
}

impl CatalogService {
    pub fn new(db: Arc<Database>, state: StateService) -> Self {
        Self { db, state }
    }

    /// Applications the robot does not hold at the exact catalog version.
    ///
    /// Every returned application is also reported SCHEDULED on a detached
    /// best-effort task, so tracking exists even if the response never
    /// reaches the robot. A catalog query failure surfaces as a storage
    /// error with no partial result.
    pub fn apps_for_robot(
        &self,
        robot_id: &str,
        installed: &[InstalledAppRef],
    ) -> Result<Vec<Application>, Error> {
        let catalog = self.db.catalog()?;
        let pending = apps_needing_install(&catalog, installed);
        debug!(
            %robot_id,
            catalog = catalog.len(),
            pending = pending.len(),
            "catalog diff computed"
        );

        if !pending.is_empty() {
            self.record_scheduled(robot_id, pending.clone());
        }
        Ok(pending)
    }

    fn record_scheduled(&self, robot_id: &str, apps: Vec<Application>) {
        let state = self.state.clone();
        let robot_id = robot_id.to_string();
        tokio::spawn(async move {
            let now = Utc::now();
            for app in &apps {
                let update = StateUpdate::scheduled(app, &robot_id, now);
                if let Err(err) = state.report(&update) {
                    warn!(
                        app_id = %app.app_id,
                        %robot_id,
                        "failed to record scheduled state: {err}"
                    );
                }
            }
        });
    }
}
