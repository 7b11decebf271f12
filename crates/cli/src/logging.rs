//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter comes from `RUST_LOG`, defaulting to `grace=warn` so that a plain
//! `grace run` only shows the child's own output. Logs go to stderr.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "grace=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, coloured
    Pretty,
    /// One JSON object per line
    Json,
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| anyhow!("Failed to create env filter: {}", e))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_quiet_and_valid() {
        assert_eq!(DEFAULT_FILTER, "grace=warn");
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
