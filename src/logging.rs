//! Log subscriber setup
//!
//! The library only emits `tracing` events. Installing a subscriber is left
//! to the binary, which calls [`init_tracing`] once at startup.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Install the global subscriber
///
/// The filter comes from `RUST_LOG` when it is set, then from `level_override`
/// (the `--log-level` flag), then from `logging.level`.
pub fn init_tracing(config: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let filter = build_filter(config, level_override)?;
    let registry = Registry::default().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().pretty()))
        }
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().compact()))
        }
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
    };

    installed.map_err(|e| Error::config("logging", format!("failed to install subscriber: {}", e)))
}

fn build_filter(config: &LoggingConfig, level_override: Option<&str>) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = level_override.unwrap_or(&config.level);
    EnvFilter::try_new(directive)
        .map_err(|e| Error::config("logging.level", format!("invalid filter {:?}: {}", directive, e)))
}
