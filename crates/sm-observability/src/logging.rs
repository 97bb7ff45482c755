//! Logging infrastructure for SecureMed.
//!
//! This module provides structured logging using the tracing ecosystem.

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events are shown by the default filter.
const LOG_TARGETS: [&str; 3] = ["sm_core", "sm_observability", "securemed"];

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include span events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include thread IDs.
    pub include_thread_ids: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a development configuration with more verbose output.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            json_format: false,
            include_spans: true,
            include_location: true,
            include_thread_ids: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json_format: true,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }

    /// Builds a configuration from a level name and format name
    /// (`"pretty"`, `"json"`). Unknown levels fall back to `info`.
    pub fn from_names(level: &str, format: &str) -> Self {
        let base = if format.eq_ignore_ascii_case("json") {
            Self::production()
        } else {
            Self::default()
        };
        Self {
            level: Level::from_str(level).unwrap_or(Level::INFO),
            ..base
        }
    }

    /// Default filter directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initializes the logging system with default configuration.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes the logging system with the given configuration.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

/// Creates a span for work on a single assignment.
#[macro_export]
macro_rules! assignment_span {
    ($assignment_id:expr) => {
        tracing::info_span!("assignment", assignment_id = %$assignment_id)
    };
    ($assignment_id:expr, $($field:tt)*) => {
        tracing::info_span!("assignment", assignment_id = %$assignment_id, $($field)*)
    };
}

/// Creates a span for a violation lifecycle change.
#[macro_export]
macro_rules! violation_span {
    ($operation:expr, $violation_id:expr) => {
        tracing::info_span!("violation", operation = %$operation, violation_id = %$violation_id)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert_eq!(config.level, Level::INFO);
        assert!(config.json_format);
    }

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_spans);
    }

    #[test]
    fn test_from_names() {
        let config = LoggingConfig::from_names("warn", "json");
        assert_eq!(config.level, Level::WARN);
        assert!(config.json_format);

        let fallback = LoggingConfig::from_names("chatty", "pretty");
        assert_eq!(fallback.level, Level::INFO);
        assert!(!fallback.json_format);
    }

    #[test]
    fn test_default_directive() {
        let config = LoggingConfig::development();
        assert_eq!(
            config.default_directive(),
            "sm_core=DEBUG,sm_observability=DEBUG,securemed=DEBUG"
        );
    }

    #[test]
    fn test_span_macros() {
        let id = uuid_like();
        let span = assignment_span!(id, nurse = "ana");
        let _entered = span.enter();
        let _violation = violation_span!("acknowledge", id);
    }

    fn uuid_like() -> String {
        "3f1c2d4e-0000-4000-8000-000000000001".to_string()
    }
}
