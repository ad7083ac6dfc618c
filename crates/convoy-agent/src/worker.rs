//! Single-flight install pipeline.
//!
//! One task owns both queues and awaits each install inline, so at most one
//! `Installer::install` call is ever in flight on the device. First
//! attempts run strictly in arrival order; failed apps wait in the error
//! queue and are recycled only once the install queue has fully drained.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use convoy_core::protocol::StateUpdate;
use convoy_core::types::{Application, ApplicationState};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::client::StatusReporter;
use crate::installer::Installer;
use crate::registry::LocalRegistry;

/// Installer failures tolerated per app before it is abandoned.
pub const DEFAULT_MAX_INSTALL_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub robot_id: String,
    pub max_attempts: u32,
    pub install_timeout: Duration,
}

/// Feeds applications into the worker task.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<Application>,
}

impl WorkerHandle {
    pub fn enqueue(&self, app: Application) {
        if let Err(err) = self.tx.send(app) {
            warn!(app_id = %err.0.app_id, "install worker is gone, dropping app");
        }
    }
}

#[derive(Debug, Clone)]
struct QueuedInstall {
    app: Application,
    retry_count: u32,
}

impl QueuedInstall {
    fn first_attempt(app: Application) -> Self {
        Self {
            app,
            retry_count: 0,
        }
    }
}

pub struct InstallWorker {
    rx: mpsc::UnboundedReceiver<Application>,
    install_queue: VecDeque<QueuedInstall>,
    error_queue: VecDeque<QueuedInstall>,
    reporter: Arc<dyn StatusReporter>,
    installer: Arc<dyn Installer>,
    registry: Arc<LocalRegistry>,
    options: WorkerOptions,
}

impl InstallWorker {
    /// Start the worker task and return the handle that feeds it.
    ///
    /// The task exits once every handle is dropped and the queues are dry.
    pub fn spawn(
        reporter: Arc<dyn StatusReporter>,
        installer: Arc<dyn Installer>,
        registry: Arc<LocalRegistry>,
        options: WorkerOptions,
    ) -> WorkerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            rx,
            install_queue: VecDeque::new(),
            error_queue: VecDeque::new(),
            reporter,
            installer,
            registry,
            options,
        };
        tokio::spawn(worker.run());
        WorkerHandle { tx }
    }

    async fn run(mut self) {
        loop {
            while let Ok(app) = self.rx.try_recv() {
                self.install_queue.push_back(QueuedInstall::first_attempt(app));
            }

            let next = match self.next_pending() {
                Some(item) => item,
                None => match self.rx.recv().await {
                    Some(app) => QueuedInstall::first_attempt(app),
                    None => break,
                },
            };
            self.process(next).await;
        }
    }

    /// Head of the install queue; once it runs dry, the error queue is
    /// recycled in one sweep and the pop is retried once.
    fn next_pending(&mut self) -> Option<QueuedInstall> {
        if let Some(item) = self.install_queue.pop_front() {
            return Some(item);
        }
        self.recycle_errored();
        self.install_queue.pop_front()
    }

    fn recycle_errored(&mut self) {
        while let Some(item) = self.error_queue.pop_front() {
            if item.retry_count < self.options.max_attempts {
                self.install_queue.push_back(item);
            } else {
                warn!(
                    app_id = %item.app.app_id,
                    version = %item.app.version,
                    attempts = item.retry_count,
                    "retry budget exhausted, abandoning app"
                );
            }
        }
    }

    async fn process(&mut self, mut item: QueuedInstall) {
        let app = item.app.clone();
        info!(app_id = %app.app_id, version = %app.version, "picked up app for install");
        self.report(
            &app,
            ApplicationState::PickedUp,
            "app picked up for download and installation".to_string(),
            item.retry_count,
        )
        .await;

        let outcome = match timeout(
            self.options.install_timeout,
            self.installer.install(&app),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "installation timed out after {}s",
                self.options.install_timeout.as_secs()
            )),
        };

        match outcome {
            Ok(()) => {
                info!(app_id = %app.app_id, version = %app.version, "app installed");
                self.registry.set(&app.app_id, &app.version);
                self.report(
                    &app,
                    ApplicationState::Completed,
                    "app installed successfully".to_string(),
                    item.retry_count,
                )
                .await;
            }
            Err(err) => {
                warn!(
                    app_id = %app.app_id,
                    version = %app.version,
                    attempt = item.retry_count + 1,
                    "installation failed: {err:#}"
                );
                self.report(
                    &app,
                    ApplicationState::Error,
                    format!("installation failed: {err:#}"),
                    item.retry_count,
                )
                .await;

                item.retry_count += 1;
                if item.retry_count < self.options.max_attempts {
                    self.error_queue.push_back(item);
                } else {
                    warn!(
                        app_id = %app.app_id,
                        version = %app.version,
                        attempts = item.retry_count,
                        "retry budget exhausted, abandoning app"
                    );
                }
            }
        }
    }

    /// Reporting failures are logged locally and never block the pipeline;
    /// only installer failures count toward the retry bound.
    async fn report(
        &self,
        app: &Application,
        state: ApplicationState,
        message: String,
        retry_count: u32,
    ) {
        let update = StateUpdate {
            app_id: app.app_id.clone(),
            robot_id: self.options.robot_id.clone(),
            version: app.version.clone(),
            retry_count,
            state,
            message: Some(message),
            timestamp: Utc::now(),
        };
        if let Err(err) = self.reporter.report(&update).await {
            warn!(
                app_id = %app.app_id,
                state = state.as_str(),
                "state report failed: {err:#}"
            );
        }
    }
}
