//! Convoy Agent - device-side install daemon
//!
//! Usage:
//!   convoy-agent --robot-id robot-7        # defaults, identity from the flag
//!   convoy-agent --config agent.toml       # explicit configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use convoy_agent::config::AgentConfig;
use convoy_agent::context::AgentContext;
use convoy_agent::installer::DryRunInstaller;

#[derive(Parser)]
#[command(name = "convoy-agent")]
#[command(about = "Fleet application install agent", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Robot identity (overrides the config file)
    #[arg(long)]
    robot_id: Option<String>,
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
    let mut config = match cli.config.as_deref() {
        Some(path) => AgentConfig::load(path)?,
        None => match cli.robot_id.as_deref() {
            Some(robot_id) => AgentConfig::new(robot_id),
            None => anyhow::bail!("either --config or --robot-id is required"),
        },
    };
    if let Some(robot_id) = cli.robot_id {
        config.robot_id = robot_id;
    }

    let context = AgentContext::new(config)?;
    let client = Arc::new(context.store_client()?);
    let worker = context.spawn_worker(client.clone(), Arc::new(DryRunInstaller));
    let scheduler = context.scheduler(client, worker);

    info!(
        robot_id = %context.config().robot_id,
        store = %context.config().store_url,
        interval_secs = context.config().sync_interval_secs,
        "agent started"
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}
