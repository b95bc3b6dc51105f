//! Logging configuration and initialization for voy-auth.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{AppMode, LogFormat, LoggingConfig};
use crate::{Result, VoyError};

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the writer: stdout, plus the log file when one is configured.
fn make_writer(file: Option<&str>) -> Result<BoxMakeWriter> {
    let Some(file) = file else {
        return Ok(BoxMakeWriter::new(std::io::stdout));
    };

    if let Some(parent) = Path::new(file).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = OpenOptions::new().create(true).append(true).open(file)?;
    Ok(BoxMakeWriter::new(std::io::stdout.and(Arc::new(log_file))))
}

/// Initialize the logging system.
///
/// The configured level is the floor; `RUST_LOG` directives are honoured on
/// top of it. Development mode logs pretty text, production logs JSON,
/// unless the config pins a format.
pub fn init(config: &LoggingConfig, mode: AppMode) -> Result<()> {
    let level = parse_level(&config.level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let writer = make_writer(config.file.as_deref())?;
    let to_file = config.file.is_some();

    let result = match config.effective_format(mode) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_current_span(false),
            )
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(!to_file)
                    .with_target(true),
            )
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| VoyError::Config(format!("failed to initialize logging: {e}")))
}

/// Initialize console-only logging (for development/testing).
pub fn init_console_only(level: &str) {
    let level = parse_level(level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(true),
        )
        .with(filter)
        .try_init();
}
