//! Notifier collaborator for escalated install failures.

use async_trait::async_trait;
use convoy_core::types::EscalationAlert;
use tracing::error;

/// Outbound alert channel. Dispatch is fire-and-forget; failures are logged
/// by the caller and never affect the reported state.
///
/// The default implementation logs the alert. Mail or chat transports plug
/// in behind this trait.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &EscalationAlert) -> anyhow::Result<()>;
}

/// Notifier that surfaces alerts in the store's own log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &EscalationAlert) -> anyhow::Result<()> {
        error!(
            robot_id = %alert.robot_id,
            app_id = %alert.app_id,
            version = %alert.version,
            reason = %alert.reason,
            "installation repeatedly failing"
        );
        Ok(())
    }
}
