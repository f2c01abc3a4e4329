use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::info;
use sshtrap::config::{cli, resolve_config};
use sshtrap::logger;
use sshtrap::server::{ServerState, TrapServer};
use sshtrap::sync::spawn_sync_tick;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let logger = logger::TrapLogger::new(log::LevelFilter::Trace)
        .init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;
    let cli: cli::Args = cli::Args::parse();

    if let Some(log_level) = cli.log_level {
        logger.set_level(log_level);
    } else {
        logger.set_level(log::LevelFilter::Info);
    };

    let config = resolve_config(cli).context("Resolving config")?;

    // Now that the config is resolved we know the real log level; replay
    // anything logged while it was still being figured out.
    logger.set_level(config.log_level);
    logger.print_deferred();

    let state = Arc::new(
        ServerState::new(config).context("Initialising server state")?,
    );

    info!(
        "Sandbox base ready at {}",
        state.config.base_dir.display()
    );

    let _sync_tick = spawn_sync_tick(state.clone());

    let mut server = TrapServer::new(state);
    server.run().await
}
