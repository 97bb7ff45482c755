//! Violation commands: list, acknowledge, resolve and reset.

use anyhow::Result;
use colored::Colorize;
use sm_core::{ActorContext, ComplianceService, ViolationFilter, ViolationStatus, ViolationView};
use tracing::Instrument;
use uuid::Uuid;

use super::{colored_severity, print_json, short, OutputFormat};

/// Which listing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationScope {
    /// Every record.
    All,
    /// Everything except scanner findings.
    Real,
    /// Scanner findings only.
    Scanner,
    /// Records owned by one nurse.
    Mine,
}

impl std::str::FromStr for ViolationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ViolationScope::All),
            "real" => Ok(ViolationScope::Real),
            "scanner" => Ok(ViolationScope::Scanner),
            "mine" | "owned" => Ok(ViolationScope::Mine),
            _ => Err(format!("Invalid view: {} (expected all, real, scanner, mine)", s)),
        }
    }
}

impl ViolationScope {
    fn filter(self, ctx: &ActorContext, nurse: Option<String>) -> ViolationFilter {
        match self {
            ViolationScope::All => ViolationFilter::All,
            ViolationScope::Real => ViolationFilter::ExcludeScanner,
            ViolationScope::Scanner => ViolationFilter::ScannerOnly,
            ViolationScope::Mine => {
                ViolationFilter::OwnedBy(nurse.unwrap_or_else(|| ctx.actor.clone()))
            }
        }
    }
}

pub async fn list(
    service: &ComplianceService,
    ctx: &ActorContext,
    scope: ViolationScope,
    nurse: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let views = service.list_violations(ctx, &scope.filter(ctx, nurse)).await?;

    if format == OutputFormat::Json {
        return print_json(&views);
    }

    println!("{}", "Violations".bold());
    println!("──────────");
    if views.is_empty() {
        println!("No violations found");
        return Ok(());
    }

    for view in &views {
        print_view(view);
    }
    println!();
    println!("{} total", views.len());
    Ok(())
}

fn print_view(view: &ViolationView) {
    let status = match view.status {
        ViolationStatus::Unresolved => view.status.to_string().red(),
        ViolationStatus::Acknowledged => view.status.to_string().yellow(),
        ViolationStatus::Resolved => view.status.to_string().green(),
    };
    println!(
        "  {} [{}] {} - {} ({})",
        short(&view.id).cyan(),
        colored_severity(view.severity),
        view.violation_type,
        status,
        view.compliance_reference
    );
    println!("      {}", view.detail);
    if !view.recommendation.is_empty() {
        println!("      {} {}", "→".cyan(), view.recommendation);
    }

    if let Some(deadline) = &view.deadline {
        match deadline.days_until_deadline {
            Some(days) if deadline.is_overdue => {
                println!("      {}", format!("OVERDUE by {} day(s)", -days).red().bold())
            }
            Some(days) => println!("      Due in {} day(s)", days),
            None => {}
        }
    }
}

pub async fn acknowledge(
    service: &ComplianceService,
    ctx: &ActorContext,
    violation_id: Uuid,
    format: OutputFormat,
) -> Result<()> {
    let ack = service
        .acknowledge_violation(ctx, violation_id)
        .instrument(sm_observability::violation_span!("acknowledge", violation_id))
        .await?;

    if format == OutputFormat::Json {
        return print_json(&ack);
    }

    if ack.changed {
        println!("{} Violation {} acknowledged", "✓".green(), short(&violation_id));
    } else {
        println!("Violation {} was already acknowledged", short(&violation_id));
    }
    Ok(())
}

pub async fn resolve(
    service: &ComplianceService,
    ctx: &ActorContext,
    violation_id: Uuid,
    format: OutputFormat,
) -> Result<()> {
    let ack = service
        .resolve_violation(ctx, violation_id)
        .instrument(sm_observability::violation_span!("resolve", violation_id))
        .await?;

    if format == OutputFormat::Json {
        return print_json(&ack);
    }

    if ack.changed {
        println!("{} Violation {} resolved", "✓".green(), short(&violation_id));
    } else {
        println!("Violation {} was already resolved", short(&violation_id));
    }
    Ok(())
}

pub async fn reset(
    service: &ComplianceService,
    ctx: &ActorContext,
    format: OutputFormat,
) -> Result<()> {
    let count = service.reset_violation_statuses(ctx).await?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "reset": count }));
    }

    println!(
        "{} {} violation(s) returned to Unresolved",
        "Reset".yellow().bold(),
        count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_filters() {
        let ana = ActorContext::nurse("ana");
        assert_eq!(
            "real".parse::<ViolationScope>().unwrap().filter(&ana, None),
            ViolationFilter::ExcludeScanner
        );
        assert_eq!(
            ViolationScope::Mine.filter(&ana, None),
            ViolationFilter::OwnedBy("ana".to_string())
        );
        assert_eq!(
            ViolationScope::Mine.filter(&ActorContext::admin("admin"), Some("jordan".to_string())),
            ViolationFilter::OwnedBy("jordan".to_string())
        );
        assert!("everything".parse::<ViolationScope>().is_err());
    }
}
