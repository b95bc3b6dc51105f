use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use voy_auth::auth::cleanup;
use voy_auth::web::{AppState, WebServer};
use voy_auth::{Config, Database, SystemClock, VoyError};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn load_config() -> voy_auth::Result<Config> {
    let path = std::env::var("VOY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = match Config::load(&path) {
        Ok(config) => config,
        Err(VoyError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("{path} not found, using defaults and environment");
            Config::default()
        }
        Err(e) => return Err(e),
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

async fn run(config: Config) -> voy_auth::Result<()> {
    info!(
        name = %config.app.name,
        mode = ?config.app.mode,
        "Starting voy-auth"
    );

    let db = Database::connect(&config.database).await?;
    info!(version = db.schema_version().await?, "Database ready");

    let state = Arc::new(AppState::from_config(
        db.clone(),
        Arc::new(SystemClock),
        &config.auth,
    )?);

    let shutdown = CancellationToken::new();
    let sweeper = cleanup::spawn(
        state.auth.clone(),
        Duration::from_secs(config.auth.cleanup_interval_secs),
        Duration::from_secs(config.auth.cleanup_timeout_secs),
        shutdown.clone(),
    );

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Shutdown requested");
        signal.cancel();
    });

    let server = WebServer::new(&config.server, state)?;
    let stop = shutdown.clone();
    let served = server.run(async move { stop.cancelled().await }).await;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Session cleanup task ended abnormally");
    }
    db.close().await;

    served
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = voy_auth::logging::init(&config.logging, config.app.mode) {
        eprintln!("Failed to initialize logging: {e}");
        voy_auth::logging::init_console_only(&config.logging.level);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "voy-auth stopped with an error");
            ExitCode::FAILURE
        }
    }
}
