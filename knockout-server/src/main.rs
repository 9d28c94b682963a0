mod config;
mod engine;
mod events;
mod http;
mod logger;
mod state;
mod store;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use thiserror::Error;
use tokio::sync::watch;

use config::{Config, ConfigError};
use events::Notifier;
use http::StatusCodeError;
use state::State;
use store::TournamentId;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
    /// Overrides the loglevel of the config.
    #[arg(short, long)]
    loglevel: Option<LevelFilter>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, missing) = match Config::from_file(&args.config).await {
        Ok(config) => (config, false),
        Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            (Config::default(), true)
        }
        Err(err) => return Err(err.into()),
    };

    let mut config = config.with_environment();
    if let Some(loglevel) = args.loglevel {
        config.loglevel = loglevel;
    }

    logger::init(config.loglevel)?;

    if missing {
        log::warn!("Config file {:?} not found, using defaults", args.config);
    }
    log::info!("Using config: {:?}", config);

    let store = store::from_config(&config.store)?;
    let events = events::spawn(Notifier::new(&config.notify));

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let state = State::new(config, store, events, shutdown_rx);

    tokio::task::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", err);
            return;
        }

        log::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    http::bind(state).await?;

    log::info!("Server stopped");
    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bracket(#[from] knockout_core::Error),
    #[error("tournament {0} has no bracket")]
    TournamentNotFound(TournamentId),
    #[error("tournament {0} already has a bracket")]
    BracketExists(TournamentId),
    #[error("bracket was modified concurrently: expected version {expected}, found {found}")]
    ConcurrentModification { expected: u64, found: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    StatusCodeError(#[from] StatusCodeError),
}
