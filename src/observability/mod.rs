//! # Observability Infrastructure
//!
//! Structured logging via the tracing ecosystem and auth counters via the
//! `metrics` facade. Exporter wiring (Prometheus scrape endpoint, OTLP, …)
//! belongs to the embedding application.

pub mod metrics;

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber from configuration.
///
/// Fails if a subscriber is already installed, so call it once from the
/// application entry point (tests skip it and rely on their own capture).
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.log_level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::config(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(())
}
