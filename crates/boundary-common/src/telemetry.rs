//! Tracing subscriber initialization
//!
//! Provides unified logging setup with:
//! - `RUST_LOG` filtering, falling back to a per-binary default
//! - Human-readable output for interactive CLI runs
//! - JSON structured logging for CI and the API service
//!
//! All output goes to stderr; stdout is reserved for generated documents.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// The rejected directive
        filter: String,
        /// Parser message
        message: String,
    },

    /// Failed to initialize tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Output format for log lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the root span (e.g., "boundary-cli")
    pub service_name: String,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "boundary".to_string(),
            default_filter: "info,boundary=debug".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl TelemetryConfig {
    /// Map an upper-case level name (`LOG_LEVEL=DEBUG`) onto a filter directive.
    ///
    /// Unknown values keep the current default.
    pub fn with_level_name(mut self, level: Option<&str>) -> Self {
        if let Some(level) = level {
            let level = level.trim().to_ascii_lowercase();
            if matches!(
                level.as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ) {
                self.default_filter = level;
            }
        }
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.default_filter).map_err(|e| {
                TelemetryError::InvalidFilter {
                    filter: self.default_filter.clone(),
                    message: e.to_string(),
                }
            }),
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Example
///
/// ```ignore
/// use boundary_common::telemetry::{init_telemetry, TelemetryConfig};
///
/// init_telemetry(TelemetryConfig {
///     service_name: "boundary-cli".to_string(),
///     ..Default::default()
/// })?;
/// ```
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = config.env_filter()?;

    let result = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
    };
    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::debug!(service = %config.service_name, "telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_level_name_overrides_default() {
        let config = TelemetryConfig::default().with_level_name(Some("DEBUG"));
        assert_eq!(config.default_filter, "debug");
    }

    #[test]
    fn test_unknown_level_keeps_default() {
        let config = TelemetryConfig::default().with_level_name(Some("LOUD"));
        assert_eq!(config.default_filter, "info,boundary=debug");

        let config = TelemetryConfig::default().with_level_name(None);
        assert_eq!(config.default_filter, "info,boundary=debug");
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "boundary");
        assert_eq!(config.format, LogFormat::Text);
    }
}
