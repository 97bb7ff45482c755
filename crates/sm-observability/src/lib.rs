//! # sm-observability
//!
//! Structured logging for SecureMed, built on `tracing`.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
