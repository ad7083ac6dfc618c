//! Install capability consumed by the queue worker.

use async_trait::async_trait;
use convoy_core::types::Application;
use tracing::info;

/// Downloads and installs one application.
///
/// The real pipeline lives behind this trait. Implementations must treat
/// re-installing an already-current version as a safe no-op, since the
/// scheduler can enqueue an app that is already mid-install.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, app: &Application) -> anyhow::Result<()>;
}

/// Placeholder installer that acknowledges the pipeline without touching
/// the system. Stands in until a device-specific installer is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunInstaller;

#[async_trait]
impl Installer for DryRunInstaller {
    async fn install(&self, app: &Application) -> anyhow::Result<()> {
        info!(
            app_id = %app.app_id,
            version = %app.version,
            url = %app.url,
            "dry-run install"
        );
        Ok(())
    }
}
