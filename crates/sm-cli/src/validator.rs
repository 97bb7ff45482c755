//! Configuration validation for SecureMed.
//!
//! Reports problems in the loaded configuration before any command touches
//! the database.

use crate::config::AppConfig;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use colored::Colorize;
use std::str::FromStr;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Errors that prevent the CLI from running.
    pub errors: Vec<String>,
    /// Warnings that should be addressed.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_database(config, &mut result);
        Self::validate_encryption_key(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    /// Validates the database URL scheme and pool bounds.
    fn validate_database(config: &AppConfig, result: &mut ValidationResult) {
        let database = &config.database;
        let url = &database.url;

        if !url.starts_with("sqlite:")
            && !url.starts_with("postgres://")
            && !url.starts_with("postgresql://")
        {
            result.add_error(format!(
                "Invalid database URL '{}'. Must start with sqlite:// or postgres://",
                url
            ));
        }

        if database.max_connections == 0 {
            result.add_error("database.max_connections must be at least 1");
        }
        if database.min_connections > database.max_connections {
            result.add_warning(format!(
                "database.min_connections ({}) exceeds max_connections ({}); it will be clamped",
                database.min_connections, database.max_connections
            ));
        }
    }

    /// Validates the detail encryption key.
    fn validate_encryption_key(config: &AppConfig, result: &mut ValidationResult) {
        let Some(key) = config.encryption.key() else {
            result.add_warning(
                "No encryption key configured. Violation details will be sealed with an \
                 ephemeral key and become unreadable after this run. \
                 Generate a key with: securemed keygen",
            );
            return;
        };

        match BASE64.decode(key) {
            Ok(bytes) if bytes.len() == 32 => {}
            Ok(bytes) => result.add_error(format!(
                "Encryption key must be 32 bytes (256 bits), got {} bytes. \
                 Generate a valid key with: securemed keygen",
                bytes.len()
            )),
            Err(_) => result.add_error(
                "Encryption key is not valid base64. Generate a valid key with: securemed keygen",
            ),
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if tracing::Level::from_str(&config.logging.level).is_err() {
            result.add_warning(format!(
                "Unknown log level '{}'; using info",
                config.logging.level
            ));
        }
        let format = config.logging.format.to_lowercase();
        if format != "pretty" && format != "json" {
            result.add_warning(format!(
                "Unknown log format '{}'; expected pretty or json",
                config.logging.format
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn test_validation_result_operations() {
        let mut result = ValidationResult::new();
        assert!(!result.has_errors());
        assert!(!result.has_warnings());

        result.add_error("Test error");
        result.add_warning("Test warning");

        assert!(result.has_errors());
        assert!(result.has_warnings());
    }

    #[test]
    fn test_invalid_database_url() {
        let mut config = default_config();
        config.database.url = "mysql://localhost/db".to_string();

        let mut result = ValidationResult::new();
        ConfigValidator::validate_database(&config, &mut result);

        assert!(result.has_errors());
    }

    #[test]
    fn test_valid_database_urls() {
        for url in &[
            "sqlite://securemed.db",
            "sqlite::memory:",
            "postgres://localhost/db",
            "postgresql://localhost/db",
        ] {
            let mut config = default_config();
            config.database.url = url.to_string();

            let mut result = ValidationResult::new();
            ConfigValidator::validate_database(&config, &mut result);

            assert!(!result.has_errors(), "URL '{}' should be valid", url);
        }
    }

    #[test]
    fn test_zero_connections_rejected() {
        let mut config = default_config();
        config.database.max_connections = 0;

        let mut result = ValidationResult::new();
        ConfigValidator::validate_database(&config, &mut result);

        assert!(result.has_errors());
    }

    #[test]
    fn test_missing_key_warns() {
        let mut result = ValidationResult::new();
        ConfigValidator::validate_encryption_key(&default_config(), &mut result);

        assert!(!result.has_errors());
        assert!(result.warnings[0].contains("ephemeral"));
    }

    #[test]
    fn test_malformed_keys_rejected() {
        for key in ["not base64!!", "c2hvcnQ="] {
            let mut config = default_config();
            config.encryption.key = key.to_string();

            let mut result = ValidationResult::new();
            ConfigValidator::validate_encryption_key(&config, &mut result);

            assert!(result.has_errors(), "key '{}' should be rejected", key);
        }
    }

    #[test]
    fn test_generated_key_accepted() {
        let mut config = default_config();
        config.encryption.key = sm_core::generate_encryption_key();

        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_unknown_log_settings_warn() {
        let mut config = default_config();
        config.logging.level = "chatty".to_string();
        config.logging.format = "xml".to_string();

        let mut result = ValidationResult::new();
        ConfigValidator::validate_logging(&config, &mut result);

        assert_eq!(result.warnings.len(), 2);
    }
}
