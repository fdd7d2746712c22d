//! Tracing subscriber setup. Logs go to stderr so command output on stdout
//! stays clean.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::{FlowConfig, LogFormat};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level applies
/// to flowboard's own targets and `warn` to dependencies.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level))
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "warn,flowboard={level},flowboard_common={level}",
        level = level
    ))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &FlowConfig) -> Result<()> {
    let filter = env_filter(&config.log_level());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match config.toml.logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
