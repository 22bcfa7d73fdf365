//! Structured logging setup.
//!
//! Installs a global `tracing-subscriber` fmt subscriber configured from
//! [`LoggingConfig`]. `RUST_LOG` overrides the configured level when set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match (config.log_to_file, config.log_file_path.as_deref()) {
        (true, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file: {e}")))?;

            let builder = builder.with_writer(Mutex::new(file)).with_ansi(false);
            if config.json_format {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
        _ => {
            if config.json_format {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
    };

    installed.map_err(|e| ProtocolError::ConfigError(format!("Failed to install logger: {e}")))?;
    info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
