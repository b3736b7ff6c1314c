//! Logging configuration and setup.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{Result, RustKitError};

/// Filter used when neither a custom filter nor `RUST_LOG` is set.
const DEFAULT_TARGETS: &[&str] = &["rustkit_gfx", "rustkit_webgl", "gfx_probe"];

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for structured logging.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level ("error", "warn", "info", "debug", "trace").
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Include source file location.
    pub include_location: bool,
    /// Include span events (enter, exit).
    pub include_span_events: bool,
    /// Custom filter string (e.g., "rustkit_gfx=trace,rustkit_webgl=warn").
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            include_span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Create a debug configuration.
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            include_location: true,
            ..Default::default()
        }
    }

    /// Create a trace configuration, which also logs every VAO creation and
    /// texture upload issued by the device.
    pub fn trace() -> Self {
        Self {
            level: "trace".to_string(),
            include_location: true,
            include_span_events: true,
            ..Default::default()
        }
    }

    /// Create a production configuration.
    pub fn production() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Json,
            ..Default::default()
        }
    }

    /// Set a custom filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Parsed log level.
    pub fn parsed_level(&self) -> Result<Level> {
        self.level.parse::<Level>().map_err(|e| {
            RustKitError::config_with_source(format!("invalid log level '{}'", self.level), e)
        })
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let level = self.parsed_level()?;
        if let Some(ref custom) = self.filter {
            return EnvFilter::try_new(custom)
                .map_err(|e| RustKitError::config_with_source("invalid log filter", e));
        }
        Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directives = DEFAULT_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, level))
                .collect::<Vec<_>>()
                .join(",");
            EnvFilter::new(format!("warn,{}", directives))
        }))
    }
}

/// Initialize logging, failing if the configuration is invalid or a global
/// subscriber is already installed.
pub fn try_init_logging(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;

    let span_events = if config.include_span_events {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let installed = match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_span_events(span_events);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(true)
                .with_span_events(span_events);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer().json().with_span_events(span_events);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
    };

    installed.map_err(|e| RustKitError::config_with_source("logging already initialized", e))
}

/// Initialize logging with the given configuration.
///
/// Invalid configurations fall back to the default one; a second call is
/// ignored.
pub fn init_logging(config: LogConfig) {
    if try_init_logging(&config).is_err() {
        let _ = try_init_logging(&LogConfig::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.parsed_level().unwrap(), Level::INFO);
        assert!(!config.include_location);
    }

    #[test]
    fn test_log_config_debug() {
        let config = LogConfig::debug();
        assert_eq!(config.parsed_level().unwrap(), Level::DEBUG);
        assert!(config.include_location);
    }

    #[test]
    fn test_log_config_with_filter() {
        let config = LogConfig::default().with_filter("rustkit_gfx=trace");
        assert_eq!(config.filter, Some("rustkit_gfx=trace".to_string()));
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_log_config_invalid_level() {
        let config = LogConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.parsed_level(),
            Err(RustKitError::Config { .. })
        ));
    }

    #[test]
    fn test_log_config_from_json() {
        let config: LogConfig =
            serde_json::from_str(r#"{ "level": "trace", "format": "json" }"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.parsed_level().unwrap(), Level::TRACE);
        assert!(config.filter.is_none());
    }
}
