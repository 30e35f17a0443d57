//! Tracing subscriber setup.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "logging.level '{}' must be one of {}",
                    self.level,
                    LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `Ok(false)`
/// when a global subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigurationError> {
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigurationError::Invalid {
            message: format!("Invalid log filter: {}", e),
        })?;

    let json_layer = config
        .json_format
        .then(|| tracing_subscriber::fmt::layer().json());
    let plain_layer = (!config.json_format).then(tracing_subscriber::fmt::layer);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .try_init()
        .is_ok();

    Ok(installed)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
