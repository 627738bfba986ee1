//! graphwatch-daemon entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use graphwatch_core::GraphwatchConfig;
use graphwatch_daemon::cli::DaemonCli;
use graphwatch_daemon::logging;
use graphwatch_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = GraphwatchConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    config
        .validate()
        .context("configuration validation failed")?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    info!(config = %cli.config.display(), "configuration loaded");

    let orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await
}
