//! SecureMed CLI
//!
//! Command-line interface for the SecureMed compliance workflow.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use sm_core::{ActivityType, ActorContext, Role, DEFAULT_AFFECTED_RECORDS, DEFAULT_AUDIT_LIMIT};
use std::path::PathBuf;
use uuid::Uuid;

mod commands;
mod config;
mod validator;

use commands::drills::FindingSet;
use commands::violations::ViolationScope;
use commands::{assignments, drills, setup, violations, OutputFormat, Session};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "securemed")]
#[command(author = "SecureMed Team")]
#[command(version)]
#[command(
    about = "HIPAA compliance workflow: assignments, verification and violation tracking",
    long_about = None
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Acting username
    #[arg(long, env = "SM_ACTOR", default_value = "admin")]
    actor: String,

    /// Role of the acting user (admin, nurse)
    #[arg(long, env = "SM_ROLE", default_value = "admin")]
    role: Role,

    /// Origin address recorded in the audit trail
    #[arg(long, env = "SM_ORIGIN")]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration and prepare the database
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Apply database migrations
    Migrate,

    /// Generate a new base64 encryption key
    Keygen,

    /// Validate configuration
    Validate,

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },

    /// Approved-destination directory
    Directory {
        #[command(subcommand)]
        action: DirectoryCommands,
    },

    /// Nurse assignments
    Assignments {
        #[command(subcommand)]
        action: AssignmentCommands,
    },

    /// Compliance violations
    Violations {
        #[command(subcommand)]
        action: ViolationCommands,
    },

    /// Show the audit trail (admin)
    Audit {
        /// Filter by action type (e.g. ASSIGNMENT_FAILED)
        #[arg(short, long)]
        action: Option<ActivityType>,

        /// Filter by acting user
        #[arg(long)]
        by: Option<String>,

        /// Maximum number of entries to show
        #[arg(short, long, default_value_t = DEFAULT_AUDIT_LIMIT)]
        limit: u32,
    },

    /// Replace seeded findings with the standard set (admin)
    Seed {
        #[command(subcommand)]
        action: SeedCommands,
    },

    /// HIPAA training
    Training {
        #[command(subcommand)]
        action: TrainingCommands,
    },

    /// Simulate a data breach (admin)
    Breach {
        /// Scenario (ransomware, insider_threat, phishing, database_exposure, physical_theft)
        #[arg(default_value = "ransomware")]
        kind: String,

        /// Number of affected patient records
        #[arg(short, long, default_value_t = DEFAULT_AFFECTED_RECORDS)]
        records: u32,
    },

    /// Demo database maintenance
    Demo {
        #[command(subcommand)]
        action: DemoCommands,
    },
}

#[derive(Subcommand)]
enum DirectoryCommands {
    /// List approved destinations
    List,
    /// Insert the standard directory if empty
    Seed,
}

#[derive(Subcommand)]
enum AssignmentCommands {
    /// Generate one assignment per patient (admin)
    Generate {
        /// Patient identifiers (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        patients: Vec<String>,

        /// Nurse usernames (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        nurses: Vec<String>,
    },

    /// List assignments (all for admins, own for nurses)
    List,

    /// Submit the destination value for an assignment (nurse)
    Complete {
        /// Assignment ID
        id: Uuid,

        /// Submitted destination value
        value: String,
    },
}

#[derive(Subcommand)]
enum ViolationCommands {
    /// List violations
    List {
        /// View (all, real, scanner, mine)
        #[arg(long, default_value = "mine")]
        view: ViolationScope,

        /// Nurse whose violations to show with --view mine
        #[arg(long)]
        nurse: Option<String>,
    },

    /// Acknowledge an owned violation (nurse)
    Ack {
        /// Violation ID
        id: Uuid,
    },

    /// Resolve a violation (admin)
    Resolve {
        /// Violation ID
        id: Uuid,
    },

    /// Return every violation to unresolved (admin)
    Reset,
}

#[derive(Subcommand)]
enum SeedCommands {
    /// Technical scanner findings
    Scanner,
    /// Organisational HIPAA findings with remediation deadlines
    Compliance,
    /// Canned nurse-conduct incidents
    Incidents,
}

#[derive(Subcommand)]
enum TrainingCommands {
    /// Record a completed quiz
    Quiz {
        /// Training module name
        #[arg(short, long, default_value = "hipaa-basics")]
        module: String,

        /// Answers as SCENARIO=correct|incorrect (repeatable)
        #[arg(short, long = "answer", required = true)]
        answers: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DemoCommands {
    /// Delete all data and re-seed the directory (admin)
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = if config_path.exists() {
        AppConfig::load(&config_path)?
    } else {
        AppConfig::default()
    };
    config.apply_env_overrides();

    // Initialize logging
    let mut logging = sm_observability::LoggingConfig::from_names(
        &config.logging.level,
        &config.logging.format,
    );
    if cli.verbose {
        logging.level = tracing::Level::DEBUG;
    }
    sm_observability::init_logging_with_config(logging);

    if cli.verbose && !config_path.exists() {
        eprintln!("Using default configuration (no config file found)");
    }

    let mut ctx = ActorContext::new(cli.actor.clone(), cli.role);
    if let Some(origin) = cli.origin.clone() {
        ctx = ctx.with_origin(origin);
    }

    let format = cli.format;
    let result = run(cli.command, &config_path, config, &ctx, format).await;

    if let Err(e) = &result {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: Commands,
    config_path: &std::path::Path,
    config: AppConfig,
    ctx: &ActorContext,
    format: OutputFormat,
) -> Result<()> {
    match command {
        Commands::Init { force } => return setup::init(config_path, config, force).await,
        Commands::Migrate => return setup::migrate(&config).await,
        Commands::Keygen => return setup::keygen(format),
        Commands::Validate => return setup::validate(config_path, &config),
        Commands::Config { show_secrets } => {
            return setup::show_config(&config, show_secrets, format)
        }
        _ => {}
    }

    let validation = validator::ConfigValidator::validate(&config);
    if validation.has_errors() {
        validation.print();
        anyhow::bail!("Configuration is invalid. Run `securemed validate` for details.");
    }

    let session = Session::open(&config).await?;
    let service = &session.service;

    let result = match command {
        Commands::Directory { action } => match action {
            DirectoryCommands::List => setup::list_directory(&session, format).await,
            DirectoryCommands::Seed => setup::seed_directory(&session).await,
        },
        Commands::Assignments { action } => match action {
            AssignmentCommands::Generate { patients, nurses } => {
                assignments::generate(service, ctx, &patients, &nurses, format).await
            }
            AssignmentCommands::List => assignments::list(service, ctx, format).await,
            AssignmentCommands::Complete { id, value } => {
                assignments::complete(service, ctx, id, &value, format).await
            }
        },
        Commands::Violations { action } => match action {
            ViolationCommands::List { view, nurse } => {
                violations::list(service, ctx, view, nurse, format).await
            }
            ViolationCommands::Ack { id } => {
                violations::acknowledge(service, ctx, id, format).await
            }
            ViolationCommands::Resolve { id } => {
                violations::resolve(service, ctx, id, format).await
            }
            ViolationCommands::Reset => violations::reset(service, ctx, format).await,
        },
        Commands::Audit { action, by, limit } => {
            setup::audit(&session, ctx, action, by, limit, format).await
        }
        Commands::Seed { action } => {
            let set = match action {
                SeedCommands::Scanner => FindingSet::Scanner,
                SeedCommands::Compliance => FindingSet::Compliance,
                SeedCommands::Incidents => FindingSet::Incidents,
            };
            drills::seed_findings(service, ctx, set, format).await
        }
        Commands::Training { action } => match action {
            TrainingCommands::Quiz { module, answers } => {
                drills::training_quiz(service, ctx, &module, &answers, format).await
            }
        },
        Commands::Breach { kind, records } => {
            drills::simulate_breach(service, ctx, &kind, records, format).await
        }
        Commands::Demo { action } => match action {
            DemoCommands::Reset { yes } => drills::reset_demo(service, ctx, yes, format).await,
        },
        Commands::Init { .. }
        | Commands::Migrate
        | Commands::Keygen
        | Commands::Validate
        | Commands::Config { .. } => Ok(()),
    };

    session.close().await;
    result
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "securemed", "securemed") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/securemed.yaml")
    }
}
