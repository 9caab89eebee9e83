//! Log output for the CLI
//!
//! Progress lines go to stdout; tracing output goes to stderr so the two
//! can be separated when piping.

use anyhow::Context;
use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for the strata binary
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter for the strata crates
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Configuration selected by the global CLI flags
    pub fn from_flags(verbose: bool, json_format: bool) -> Self {
        Self {
            level: if verbose { "debug" } else { "info" }.to_string(),
            json_format,
            include_location: verbose,
        }
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn env_filter(&self) -> String {
        format!(
            "warn,strata={level},strata_orm={level},strata_core={level}",
            level = self.level
        )
    }
}

/// Install the global subscriber
pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.env_filter()).context("invalid log filter")?,
    };

    let layer = Layer::new()
        .with_writer(io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
            .context("failed to install log subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.without_time())
            .try_init()
            .context("failed to install log subscriber")?;
    }

    tracing::debug!(
        "logging initialized (level: {}, format: {})",
        config.level,
        if config.json_format { "JSON" } else { "text" }
    );
    Ok(())
}
