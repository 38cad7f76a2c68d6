use anyhow::{Context, Result};
use memory_inspector::config::{load_config, validate_config, LoggingConfig};
use memory_inspector::{Engine, Server};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // argv[1], then $MEMORY_INSPECTOR_CONFIG, then ./config.toml
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;
    validate_config(&config).context("invalid configuration")?;

    init_logging(&config.logging);
    info!(
        "Starting memory-inspector v{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    let engine = Engine::with_system_processes(config).context("failed to start engine")?;
    Server::new(engine)
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    info!("Shutting down memory-inspector");
    Ok(())
}
