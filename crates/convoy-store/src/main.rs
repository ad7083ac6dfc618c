//! Convoy Store - fleet deployment server
//!
//! Usage:
//!   convoy-store                      # defaults (127.0.0.1:8080, ./convoy-store.db)
//!   convoy-store --config store.toml  # explicit configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use convoy_core::escalation::EscalationPolicy;
use convoy_store::api;
use convoy_store::catalog::CatalogService;
use convoy_store::config::{CatalogFile, StoreConfig};
use convoy_store::db::Database;
use convoy_store::log::SqliteLog;
use convoy_store::notify::LogNotifier;
use convoy_store::state::StateService;

#[derive(Parser)]
#[command(name = "convoy-store")]
#[command(about = "Fleet application deployment store", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };

    let db = Arc::new(
        Database::open(&config.db_path)
            .with_context(|| format!("Failed to open database: {}", config.db_path.display()))?,
    );

    if let Some(catalog_file) = &config.catalog_file {
        let apps = CatalogFile::load(catalog_file)?.applications();
        db.upsert_catalog(&apps)
            .context("Failed to seed catalog")?;
        info!(count = apps.len(), "catalog seeded");
    }

    let state = StateService::new(
        Arc::clone(&db),
        Arc::new(SqliteLog::new(Arc::clone(&db))),
        Arc::new(LogNotifier),
        EscalationPolicy::new(config.escalation_threshold),
    );
    let catalog = CatalogService::new(db, state.clone());
    let router = api::router(catalog, state);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "store listening");
    axum::serve(listener, router).await.context("HTTP server failed")
}
