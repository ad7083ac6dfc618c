use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use convoy_agent::client::StatusReporter;
use convoy_agent::installer::Installer;
use convoy_agent::registry::LocalRegistry;
use convoy_agent::worker::{InstallWorker, WorkerOptions};
use convoy_core::protocol::StateUpdate;
use convoy_core::types::{Application, ApplicationState};

fn app(app_id: &str, version: &str) -> Application {
    Application {
        app_id: app_id.to_string(),
        name: format!("{app_id}-name"),
        version: version.to_string(),
        url: format!("https://store.example/{app_id}/{version}.pkg"),
    }
}

fn options() -> WorkerOptions {
    WorkerOptions {
        robot_id: "robot-7".to_string(),
        max_attempts: 3,
        install_timeout: Duration::from_secs(5),
    }
}

/// Installer scripted with a number of failures per app id; records the
/// invocation order and how many installs ever overlapped.
struct ScriptedInstaller {
    failures_left: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl ScriptedInstaller {
    fn new(failures: &[(&str, u32)], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            failures_left: Mutex::new(
                failures
                    .iter()
                    .map(|(app_id, count)| (app_id.to_string(), *count))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Installer for ScriptedInstaller {
    async fn install(&self, app: &Application) -> anyhow::Result<()> {
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(concurrent, Ordering::SeqCst);
        self.calls.lock().unwrap().push(app.app_id.clone());

        tokio::time::sleep(self.delay).await;

        let result = {
            let mut failures = self.failures_left.lock().unwrap();
            match failures.get_mut(&app.app_id) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    Err(anyhow::anyhow!("download failed"))
                }
                _ => Ok(()),
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[derive(Default)]
struct RecordingReporter {
    updates: Mutex<Vec<StateUpdate>>,
    fail: AtomicBool,
}

impl RecordingReporter {
    fn states_for(&self, app_id: &str) -> Vec<(ApplicationState, u32)> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|update| update.app_id == app_id)
            .map(|update| (update.state, update.retry_count))
            .collect()
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn report(&self, update: &StateUpdate) -> anyhow::Result<()> {
        self.updates.lock().unwrap().push(update.clone());
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("store unreachable")
        }
        Ok(())
    }
}

async fn wait_until(f: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    f()
}

#[tokio::test]
async fn successful_install_reports_and_updates_the_registry() {
    let installer = ScriptedInstaller::new(&[], Duration::from_millis(1));
    let reporter = Arc::new(RecordingReporter::default());
    let registry = Arc::new(LocalRegistry::in_memory());
    let handle = InstallWorker::spawn(
        reporter.clone(),
        installer.clone(),
        registry.clone(),
        options(),
    );

    handle.enqueue(app("maps", "1.0"));

    assert!(wait_until(|| registry.installed_version("maps").is_some()).await);
    assert_eq!(registry.installed_version("maps").as_deref(), Some("1.0"));
    assert!(
        wait_until(|| {
            reporter.states_for("maps")
                == vec![
                    (ApplicationState::PickedUp, 0),
                    (ApplicationState::Completed, 0),
                ]
        })
        .await
    );
}

#[tokio::test]
async fn always_failing_app_is_reported_error_exactly_three_times() {
    let installer = ScriptedInstaller::new(&[("maps", u32::MAX)], Duration::from_millis(1));
    let reporter = Arc::new(RecordingReporter::default());
    let registry = Arc::new(LocalRegistry::in_memory());
    let handle = InstallWorker::spawn(
        reporter.clone(),
        installer.clone(),
        registry.clone(),
        options(),
    );

    handle.enqueue(app("maps", "1.0"));

    let errors = |reporter: &RecordingReporter| {
        reporter
            .states_for("maps")
            .iter()
            .filter(|(state, _)| *state == ApplicationState::Error)
            .count()
    };
    assert!(wait_until(|| errors(&reporter) == 3).await);

    // The retry budget is spent; nothing further happens.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(errors(&reporter), 3);
    assert_eq!(installer.calls().len(), 3);
    assert!(registry.installed_version("maps").is_none());

    // Each ERROR carried the retry count at the moment of the attempt.
    let error_counts: Vec<u32> = reporter
        .states_for("maps")
        .into_iter()
        .filter(|(state, _)| *state == ApplicationState::Error)
        .map(|(_, retry_count)| retry_count)
        .collect();
    assert_eq!(error_counts, vec![0, 1, 2]);
}

#[tokio::test(flavor = "multi_thread")]
async fn installs_never_overlap() {
    let installer = ScriptedInstaller::new(&[], Duration::from_millis(20));
    let reporter = Arc::new(RecordingReporter::default());
    let registry = Arc::new(LocalRegistry::in_memory());
    let handle = InstallWorker::spawn(
        reporter.clone(),
        installer.clone(),
        registry.clone(),
        options(),
    );

    for index in 0..4 {
        handle.enqueue(app(&format!("app-{index}"), "1.0"));
    }

    assert!(wait_until(|| installer.calls().len() == 4).await);
    assert!(wait_until(|| registry.snapshot().len() == 4).await);
    assert_eq!(installer.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_run_only_after_first_attempts_drain() {
    let installer = ScriptedInstaller::new(&[("a", 1)], Duration::from_millis(5));
    let reporter = Arc::new(RecordingReporter::default());
    let registry = Arc::new(LocalRegistry::in_memory());
    let handle = InstallWorker::spawn(
        reporter.clone(),
        installer.clone(),
        registry.clone(),
        options(),
    );

    handle.enqueue(app("a", "1.0"));
    handle.enqueue(app("b", "1.0"));

    assert!(wait_until(|| installer.calls().len() == 3).await);
    assert_eq!(installer.calls(), vec!["a", "b", "a"]);
    assert!(wait_until(|| registry.installed_version("a").is_some()).await);
}

#[tokio::test]
async fn reporting_failures_neither_block_nor_consume_retries() {
    let installer = ScriptedInstaller::new(&[], Duration::from_millis(1));
    let reporter = Arc::new(RecordingReporter::default());
    reporter.fail.store(true, Ordering::SeqCst);
    let registry = Arc::new(LocalRegistry::in_memory());
    let handle = InstallWorker::spawn(
        reporter.clone(),
        installer.clone(),
        registry.clone(),
        options(),
    );

    handle.enqueue(app("maps", "1.0"));
    handle.enqueue(app("nav", "2.0"));

    assert!(wait_until(|| registry.snapshot().len() == 2).await);
    // Each app was installed exactly once despite every report failing.
    assert_eq!(installer.calls(), vec!["maps", "nav"]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(installer.calls().len(), 2);
}

#[tokio::test]
async fn install_timeout_counts_as_a_failed_attempt() {
    struct HangingInstaller;

    #[async_trait]
    impl Installer for HangingInstaller {
        async fn install(&self, _app: &Application) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    let reporter = Arc::new(RecordingReporter::default());
    let registry = Arc::new(LocalRegistry::in_memory());
    let handle = InstallWorker::spawn(
        reporter.clone(),
        Arc::new(HangingInstaller),
        registry.clone(),
        WorkerOptions {
            robot_id: "robot-7".to_string(),
            max_attempts: 1,
            install_timeout: Duration::from_millis(20),
        },
    );

    handle.enqueue(app("maps", "1.0"));

    assert!(
        wait_until(|| {
            reporter
                .states_for("maps")
                .iter()
                .any(|(state, _)| *state == ApplicationState::Error)
        })
        .await
    );
    assert!(registry.installed_version("maps").is_none());
}
