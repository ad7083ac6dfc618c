//! Outbound RPC surface toward the store.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use convoy_core::protocol::{FetchAppsRequest, FetchAppsResponse, StateUpdate};
use convoy_core::types::{Application, InstalledAppRef};

/// Fetches the set of applications a robot still needs.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_apps(
        &self,
        robot_id: &str,
        installed: &[InstalledAppRef],
    ) -> anyhow::Result<Vec<Application>>;
}

/// Reports one installation-state transition to the store.
///
/// Reporting failures are the caller's to log; they are never retried and
/// never block the install pipeline.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, update: &StateUpdate) -> anyhow::Result<()>;
}

/// HTTP client for both store routes, with a bounded request timeout.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("convoy-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogClient for StoreClient {
    async fn fetch_apps(
        &self,
        robot_id: &str,
        installed: &[InstalledAppRef],
    ) -> anyhow::Result<Vec<Application>> {
        let url = format!("{}/api/apps", self.base_url);
        let request = FetchAppsRequest {
            robot_id: robot_id.to_string(),
            installed_apps: installed.to_vec(),
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to fetch apps from {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("Store returned HTTP {} from {url}", response.status());
        }

        let body: FetchAppsResponse = response
            .json()
            .await
            .context("Invalid fetch-apps response body")?;
        Ok(body.applications)
    }
}

#[async_trait]
impl StatusReporter for StoreClient {
    async fn report(&self, update: &StateUpdate) -> anyhow::Result<()> {
        let url = format!("{}/api/state-update", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(update)
            .send()
            .await
            .with_context(|| format!("Failed to report state to {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("Store returned HTTP {} from {url}", response.status());
        }
        Ok(())
    }
}
