use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::FVError;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("filmview.log")
}

/// Logs go to a file only, the terminal belongs to the UI. `RUST_LOG` overrides the level.
pub fn init(log_file: &Path) -> Result<(), FVError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .map_err(|e| FVError::LoggingFailed(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| FVError::LoggingFailed(e.to_string()))
}
