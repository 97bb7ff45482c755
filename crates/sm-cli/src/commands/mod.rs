//! CLI command implementations.

pub mod assignments;
pub mod drills;
pub mod setup;
pub mod violations;

use anyhow::{Context, Result};
use serde::Serialize;
use sm_core::db::{create_pool_with_options, run_migrations, DbPool};
use sm_core::{create_cipher, ComplianceService, ServiceConfig, Severity};

use crate::config::AppConfig;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// An open database with the service built over it.
pub struct Session {
    pub pool: DbPool,
    pub service: ComplianceService,
}

impl Session {
    /// Connects to the configured database and brings its schema up to date.
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let pool = create_pool_with_options(&config.database.url, config.database.pool_options())
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to {}",
                    config.redact_secrets().database.url
                )
            })?;

        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        let cipher = create_cipher(config.encryption.key()).context("Invalid encryption key")?;
        let service = ComplianceService::from_pool(
            &pool,
            cipher,
            ServiceConfig {
                trim_submission: config.verification.trim_submission,
            },
        );

        Ok(Self { pool, service })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn short(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

pub(crate) fn colored_severity(severity: Severity) -> colored::ColoredString {
    use colored::Colorize;

    let label = severity.to_string();
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.cyan(),
    }
}
