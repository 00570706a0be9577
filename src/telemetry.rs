//! Structured logging setup.

use crate::domain::error::TraderError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
///
/// Logs go to stderr so report output on stdout stays clean.
pub fn init_logging(level: &str) -> Result<(), TraderError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| TraderError::Telemetry {
            reason: format!("bad log filter '{}': {}", level, e),
        })?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| TraderError::Telemetry {
            reason: e.to_string(),
        })
}
