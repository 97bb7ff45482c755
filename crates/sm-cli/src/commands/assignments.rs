//! Assignment commands: generate, list and complete.

use anyhow::Result;
use colored::Colorize;
use sm_core::{ActorContext, AssignmentStatus, ComplianceService};
use tracing::Instrument;
use uuid::Uuid;

use super::{print_json, short, OutputFormat};

pub async fn generate(
    service: &ComplianceService,
    ctx: &ActorContext,
    patients: &[String],
    nurses: &[String],
    format: OutputFormat,
) -> Result<()> {
    let summary = service.generate_assignments(ctx, patients, nurses).await?;

    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    println!(
        "{} {} assignments for {} nurse(s)",
        "Generated".green().bold(),
        summary.created_count,
        nurses.len()
    );
    for id in &summary.assignment_ids {
        println!("  {}", short(id).cyan());
    }
    Ok(())
}

pub async fn list(
    service: &ComplianceService,
    ctx: &ActorContext,
    format: OutputFormat,
) -> Result<()> {
    let assignments = service.list_assignments(ctx).await?;

    if format == OutputFormat::Json {
        return print_json(&assignments);
    }

    println!("{}", "Assignments".bold());
    println!("───────────");
    if assignments.is_empty() {
        println!("No assignments found");
        return Ok(());
    }

    for assignment in &assignments {
        let status = match assignment.status {
            AssignmentStatus::Pending => assignment.status.to_string().yellow(),
            AssignmentStatus::Completed => assignment.status.to_string().green(),
            AssignmentStatus::Failed => assignment.status.to_string().red(),
        };
        println!(
            "  {} [{}] {} → {} ({})",
            assignment.short_id().cyan(),
            status,
            assignment.description,
            assignment.assigned_to,
            assignment.compliance_reference
        );
    }
    println!();
    println!("{} total", assignments.len());
    Ok(())
}

pub async fn complete(
    service: &ComplianceService,
    ctx: &ActorContext,
    assignment_id: Uuid,
    value: &str,
    format: OutputFormat,
) -> Result<()> {
    let outcome = service
        .complete_assignment(ctx, assignment_id, value)
        .instrument(sm_observability::assignment_span!(assignment_id, actor = %ctx.actor))
        .await?;

    if format == OutputFormat::Json {
        return print_json(&outcome);
    }

    match outcome.status {
        AssignmentStatus::Completed => {
            println!("{} Assignment {} completed", "✓".green(), short(&assignment_id));
        }
        _ => {
            println!(
                "{} Incorrect value for assignment {}",
                "✗".red(),
                short(&assignment_id)
            );
            if let Some(violation_id) = outcome.violation_id {
                println!(
                    "  Violation {} recorded. Review it with: {}",
                    short(&violation_id).yellow(),
                    "securemed violations list --view mine"
                );
            }
        }
    }
    Ok(())
}
