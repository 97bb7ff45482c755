//! Demo and drill commands: finding seeds, training quiz, breach simulation, reset.

use anyhow::{anyhow, Result};
use colored::Colorize;
use sm_core::{ActorContext, BreachKind, ComplianceService, QuizAnswer};

use super::{colored_severity, print_json, short, OutputFormat};

/// Which finding set to seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingSet {
    Scanner,
    Compliance,
    Incidents,
}

pub async fn seed_findings(
    service: &ComplianceService,
    ctx: &ActorContext,
    set: FindingSet,
    format: OutputFormat,
) -> Result<()> {
    let count = match set {
        FindingSet::Scanner => service.seed_scanner_findings(ctx).await?,
        FindingSet::Compliance => service.seed_compliance_findings(ctx).await?,
        FindingSet::Incidents => service.seed_nurse_incidents(ctx).await?,
    };

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "seeded": count }));
    }
    println!("{} {} findings", "Seeded".green().bold(), count);
    Ok(())
}

/// Parses `scenario=correct` / `scenario=incorrect`.
pub fn parse_answer(raw: &str) -> Result<QuizAnswer> {
    let (scenario, verdict) = raw
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("Expected SCENARIO=correct|incorrect, got '{}'", raw))?;

    let is_correct = match verdict.trim().to_lowercase().as_str() {
        "correct" | "true" | "yes" | "pass" => true,
        "incorrect" | "false" | "no" | "fail" => false,
        other => {
            return Err(anyhow!(
                "Unknown answer verdict '{}' for '{}'",
                other,
                scenario
            ))
        }
    };

    let scenario = scenario.trim();
    if scenario.is_empty() {
        return Err(anyhow!("Answer '{}' has no scenario name", raw));
    }
    Ok(QuizAnswer::new(scenario, is_correct))
}

pub async fn training_quiz(
    service: &ComplianceService,
    ctx: &ActorContext,
    module: &str,
    answers: &[String],
    format: OutputFormat,
) -> Result<()> {
    let answers = answers
        .iter()
        .map(|raw| parse_answer(raw))
        .collect::<Result<Vec<_>>>()?;

    let result = service.submit_training_quiz(ctx, module, &answers).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    let verdict = if result.passed {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "Module {}: {} ({}/{} correct)",
        module.cyan(),
        verdict,
        result.correct,
        result.total
    );
    if result.correct < result.total {
        println!(
            "  {} training violation(s) recorded for {}",
            result.total - result.correct,
            ctx.actor
        );
    }
    Ok(())
}

pub async fn simulate_breach(
    service: &ComplianceService,
    ctx: &ActorContext,
    kind: &str,
    affected_records: u32,
    format: OutputFormat,
) -> Result<()> {
    let kind = BreachKind::from_name_or_default(kind);
    let outcome = service.simulate_breach(ctx, kind, affected_records).await?;

    if format == OutputFormat::Json {
        return print_json(&outcome);
    }

    println!("{}", "BREACH SIMULATION".red().bold());
    println!("─────────────────");
    println!("  Scenario: {}", outcome.kind);
    println!(
        "  Violation: {} [{}] {}",
        short(&outcome.violation_id).cyan(),
        colored_severity(outcome.severity),
        outcome.violation_type
    );
    println!("  Affected records: {}", outcome.affected_records);
    Ok(())
}

pub async fn reset_demo(
    service: &ComplianceService,
    ctx: &ActorContext,
    confirmed: bool,
    format: OutputFormat,
) -> Result<()> {
    if !confirmed {
        println!(
            "{}: this deletes every assignment, violation and audit entry",
            "Confirm".yellow()
        );
        println!("(use --yes to proceed)");
        return Ok(());
    }

    let summary = service.reset_demo(ctx).await?;

    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    println!("{}", "Demo database reset".green().bold());
    println!("  Assignments removed: {}", summary.assignments_deleted);
    println!("  Violations removed: {}", summary.violations_deleted);
    println!("  Audit entries removed: {}", summary.activity_deleted);
    println!("  Directory entries re-seeded: {}", summary.directory_seeded);
    Ok(())
}
