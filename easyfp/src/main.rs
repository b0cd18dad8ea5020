mod config;
mod observability;

use clap::Parser;
use config::{Config, ConfigError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "easyfp", about = "Device fingerprint ingest service")]
enum CliCommand {
    /// Serve the beacon endpoint
    Run {
        #[arg(long, short, default_value = "easyfp.yaml")]
        config: PathBuf,
    },
    /// Load and validate a config file, then exit
    CheckConfig {
        #[arg(long, short, default_value = "easyfp.yaml")]
        config: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] observability::MetricsError),
    #[error("could not open device store: {0}")]
    Store(#[from] device_store::StoreError),
    #[error(transparent)]
    Ingest(#[from] ingest::errors::IngestError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let result = match CliCommand::parse() {
        CliCommand::Run { config } => run(&config),
        CliCommand::CheckConfig { config } => Config::from_file(&config)
            .map(|_| println!("{}: ok", config.display()))
            .map_err(CliError::from),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("easyfp: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &std::path::Path) -> Result<(), CliError> {
    let config = Config::from_file(path)?;

    let _sentry = observability::init_logging(&config.common.logging);
    if let Some(metrics) = &config.common.metrics {
        observability::init_metrics(metrics)?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_async(config))
}

async fn run_async(config: Config) -> Result<(), CliError> {
    let store = device_store::open(&config.store).await?;
    tracing::info!(store = ?config.store.r#type, "device store opened");

    tokio::select! {
        result = ingest::run(config.ingest, store) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }
    Ok(())
}
