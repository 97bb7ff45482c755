//! Setup and read-only commands: init, migrate, keygen, directory, audit.

use anyhow::{bail, Result};
use colored::Colorize;
use sm_core::{generate_encryption_key, ActivityFilter, ActivityType, ActorContext};
use std::path::Path;

use super::{print_json, OutputFormat, Session};
use crate::config::AppConfig;
use crate::validator::ConfigValidator;

/// Writes a starter configuration with a fresh key, then prepares the database.
pub async fn init(config_path: &Path, mut config: AppConfig, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!(
            "Configuration already exists at {} (use --force to overwrite)",
            config_path.display().to_string().cyan()
        );
    } else {
        if config.encryption.key().is_none() {
            config.encryption.key = generate_encryption_key();
        }
        config.save(config_path)?;
        println!(
            "{} {}",
            "Wrote configuration to".green(),
            config_path.display().to_string().cyan()
        );
    }

    let session = Session::open(&config).await?;
    let seeded = session.service.seed_directory().await?;
    println!(
        "{} {} ({} directory entries seeded)",
        "Database ready:".green().bold(),
        session.pool.db_type(),
        seeded
    );
    session.close().await;
    Ok(())
}

pub async fn migrate(config: &AppConfig) -> Result<()> {
    let session = Session::open(config).await?;
    println!("{} ({})", "Migrations applied".green(), session.pool.db_type());
    let health = if session.pool.is_healthy().await {
        "healthy".green()
    } else {
        "unreachable".red()
    };
    println!(
        "  Connection: {} ({} open, {} idle)",
        health,
        session.pool.pool_size(),
        session.pool.idle_connections()
    );
    session.close().await;
    Ok(())
}

pub fn keygen(format: OutputFormat) -> Result<()> {
    let key = generate_encryption_key();
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "key": key }));
    }
    println!("{}", key);
    eprintln!(
        "Set it as encryption.key in the config file or export {}",
        sm_core::crypto::ENCRYPTION_KEY_ENV
    );
    Ok(())
}

pub fn validate(config_path: &Path, config: &AppConfig) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    let result = ConfigValidator::validate(config);
    result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  Database: {}", config.redact_secrets().database.url);
    println!(
        "  Encryption key: {}",
        if config.encryption.key().is_some() { "configured" } else { "ephemeral" }
    );
    println!("  Trim submissions: {}", config.verification.trim_submission);

    println!();
    if result.has_errors() {
        bail!("Configuration validation failed. Fix the errors above.");
    } else if result.has_warnings() {
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!("{}", "Configuration is valid.".green().bold());
    }
    Ok(())
}

pub fn show_config(config: &AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config.clone()
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        return print_json(&display_config);
    }

    println!("{}", "Current Configuration".bold());
    println!("─────────────────────────");
    print!("{}", serde_yaml::to_string(&display_config)?);
    Ok(())
}

pub async fn list_directory(session: &Session, format: OutputFormat) -> Result<()> {
    let entries = session.service.list_directory().await?;

    if format == OutputFormat::Json {
        return print_json(&entries);
    }

    println!("{}", "Approved Directory".bold());
    println!("──────────────────");
    let mut current = None;
    for entry in &entries {
        if current != Some(entry.channel) {
            println!();
            println!("{}", entry.channel.to_string().bold());
            current = Some(entry.channel);
        }
        println!(
            "  {:<40} {:<36} {}",
            entry.display_name,
            entry.target_value.cyan(),
            entry.department
        );
    }
    if entries.is_empty() {
        println!("Directory is empty. Seed it with: securemed directory seed");
    }
    Ok(())
}

pub async fn seed_directory(session: &Session) -> Result<()> {
    match session.service.seed_directory().await? {
        0 => println!("Directory already populated"),
        n => println!("{} {} directory entries", "Seeded".green(), n),
    }
    Ok(())
}

pub async fn audit(
    session: &Session,
    ctx: &ActorContext,
    action_type: Option<ActivityType>,
    actor: Option<String>,
    limit: u32,
    format: OutputFormat,
) -> Result<()> {
    let filter = ActivityFilter {
        action_type,
        actor,
        limit,
    };
    let entries = session.service.audit_trail(ctx, &filter).await?;

    if format == OutputFormat::Json {
        return print_json(&entries);
    }

    println!("{}", "Audit Trail".bold());
    println!("───────────");
    for entry in &entries {
        println!(
            "  {} {:<26} {:<10} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action_type.to_string().cyan(),
            entry.actor,
            entry.description
        );
        if let Some(detail) = &entry.detail {
            println!("      {}", detail.dimmed());
        }
    }
    if entries.is_empty() {
        println!("No activity recorded");
    }
    Ok(())
}
