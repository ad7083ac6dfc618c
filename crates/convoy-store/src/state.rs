//! Idempotent installation-state store.

use std::sync::Arc;

use chrono::Utc;
use convoy_core::error::Error;
use convoy_core::escalation::EscalationPolicy;
use convoy_core::protocol::StateUpdate;
use convoy_core::types::{EscalationAlert, LogEntry};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::log::TransitionLog;
use crate::notify::Notifier;

/// Applies reported transitions to the canonical per-(app, robot) records.
///
/// Each report escalates if warranted, upserts the state record, and trails
/// one best-effort log entry. Alert dispatch runs on a detached task, so
/// `report` must be called from within a tokio runtime.
#[derive(Clone)]
pub struct StateService {
    db: Arc<Database>,
    log: Arc<dyn TransitionLog>,
    notifier: Arc<dyn Notifier>,
    policy: EscalationPolicy,
}

impl StateService {
    pub fn new(
        db: Arc<Database>,
        log: Arc<dyn TransitionLog>,
        notifier: Arc<dyn Notifier>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            db,
            log,
            notifier,
            policy,
        }
    }

    /// Record one transition and return the record's stable state id.
    ///
    /// Repeated reports for the same (app_id, robot_id) keep the state id
    /// assigned on first creation. The escalation predicate is evaluated
    /// before persistence; the log append afterwards is best-effort and
    /// never fails the call.
    pub fn report(&self, update: &StateUpdate) -> Result<String, Error> {
        if self.policy.should_alert(update.state, update.retry_count) {
            self.dispatch_alert(update);
        }

        let state_id = self.db.upsert_state(update, Utc::now())?;
        debug!(
            app_id = %update.app_id,
            robot_id = %update.robot_id,
            state = update.state.as_str(),
            %state_id,
            "state recorded"
        );

        let entry = LogEntry {
            log_id: Uuid::new_v4().to_string(),
            state_id: state_id.clone(),
            app_id: update.app_id.clone(),
            robot_id: update.robot_id.clone(),
            state: update.state,
            message: update.message.clone(),
            version: update.version.clone(),
            retries: update.retry_count,
            entered_at: Utc::now(),
            op_performed_at: update.timestamp,
        };
        if let Err(err) = self.log.append(&entry) {
            warn!(
                app_id = %update.app_id,
                robot_id = %update.robot_id,
                "failed to append transition log: {err:#}"
            );
        }

        Ok(state_id)
    }

    fn dispatch_alert(&self, update: &StateUpdate) {
        let alert = EscalationAlert {
            robot_id: update.robot_id.clone(),
            app_id: update.app_id.clone(),
            version: update.version.clone(),
            reason: update
                .message
                .clone()
                .unwrap_or_else(|| "installation failed after repeated attempts".to_string()),
        };
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            match notifier.notify(&alert).await {
                Ok(()) => debug!(app_id = %alert.app_id, robot_id = %alert.robot_id, "alert dispatched"),
                Err(err) => warn!(
                    app_id = %alert.app_id,
                    robot_id = %alert.robot_id,
                    "alert dispatch failed: {err:#}"
                ),
            }
        });
    }
}
