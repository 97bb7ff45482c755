//! Data-breach simulations for incident-response drills.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use super::ComplianceService;
use crate::activity::ActivityType;
use crate::auth::ActorContext;
use crate::error::ComplianceResult;
use crate::violation::{NewViolation, Severity, ViolationOrigin};

pub const DEFAULT_AFFECTED_RECORDS: u32 = 100;

/// Simulated breach scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachKind {
    Ransomware,
    InsiderThreat,
    Phishing,
    DatabaseExposure,
    PhysicalTheft,
}

impl BreachKind {
    pub const ALL: [BreachKind; 5] = [
        BreachKind::Ransomware,
        BreachKind::InsiderThreat,
        BreachKind::Phishing,
        BreachKind::DatabaseExposure,
        BreachKind::PhysicalTheft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BreachKind::Ransomware => "ransomware",
            BreachKind::InsiderThreat => "insider_threat",
            BreachKind::Phishing => "phishing",
            BreachKind::DatabaseExposure => "database_exposure",
            BreachKind::PhysicalTheft => "physical_theft",
        }
    }

    /// Parses a scenario name, falling back to ransomware for unknown names.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(kind = name, "Unknown breach scenario, using ransomware");
            BreachKind::Ransomware
        })
    }

    fn violation_type(&self) -> &'static str {
        match self {
            BreachKind::Ransomware => "RANSOMWARE ATTACK",
            BreachKind::InsiderThreat => "INSIDER DATA THEFT",
            BreachKind::Phishing => "PHISHING ATTACK - CREDENTIALS COMPROMISED",
            BreachKind::DatabaseExposure => "DATABASE EXPOSED TO INTERNET",
            BreachKind::PhysicalTheft => "LAPTOP THEFT WITH UNENCRYPTED PHI",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            BreachKind::Phishing | BreachKind::PhysicalTheft => Severity::High,
            _ => Severity::Critical,
        }
    }

    fn detail(&self, affected_records: u32) -> String {
        match self {
            BreachKind::Ransomware => format!(
                "Ransomware encrypted {} patient records. Attackers demand $50,000 Bitcoin payment. Systems locked.",
                affected_records
            ),
            BreachKind::InsiderThreat => format!(
                "Employee downloaded {} patient records to personal device before resignation. PHI compromised.",
                affected_records
            ),
            BreachKind::Phishing => format!(
                "5 employees fell for phishing email. Attacker accessed {} patient records via stolen credentials.",
                affected_records
            ),
            BreachKind::DatabaseExposure => format!(
                "Misconfigured database exposed {} patient records publicly for 30 days. Search engines indexed data.",
                affected_records
            ),
            BreachKind::PhysicalTheft => format!(
                "Unencrypted laptop stolen from employee vehicle containing {} patient records.",
                affected_records
            ),
        }
    }

    fn recommendation(&self) -> &'static str {
        match self {
            BreachKind::Ransomware => {
                "DO NOT PAY. Activate incident response team, isolate infected systems, restore from backups, notify HHS within 60 days"
            }
            BreachKind::InsiderThreat => {
                "Terminate access immediately, conduct forensic investigation, notify affected patients, file police report"
            }
            BreachKind::Phishing => {
                "Reset all passwords, enable MFA, conduct phishing awareness training, monitor for unauthorized access"
            }
            BreachKind::DatabaseExposure => {
                "Secure database immediately, request search engine delisting, notify HHS and affected individuals within 60 days"
            }
            BreachKind::PhysicalTheft => {
                "File police report, notify affected patients, implement mandatory encryption policy, remote wipe if possible"
            }
        }
    }

    fn compliance_reference(&self) -> &'static str {
        match self {
            BreachKind::Ransomware => "164.308(a)(6)(ii)",
            BreachKind::InsiderThreat => "164.308(a)(3)(ii)(A)",
            BreachKind::Phishing => "164.308(a)(5)(ii)(B)",
            BreachKind::DatabaseExposure => "164.312(a)(1)",
            BreachKind::PhysicalTheft => "164.312(a)(2)(iv)",
        }
    }
}

impl fmt::Display for BreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BreachKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        BreachKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("Unknown breach scenario: {}", s))
    }
}

/// The violation opened by a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachOutcome {
    pub violation_id: Uuid,
    pub kind: BreachKind,
    pub violation_type: String,
    pub severity: Severity,
    pub affected_records: u32,
}

impl ComplianceService {
    /// Opens an unresolved breach violation for the scenario. Administrators only.
    pub async fn simulate_breach(
        &self,
        ctx: &ActorContext,
        kind: BreachKind,
        affected_records: u32,
    ) -> ComplianceResult<BreachOutcome> {
        ctx.require_admin("simulate a data breach")?;

        let violation = NewViolation::new(
            kind.violation_type(),
            kind.severity(),
            ViolationOrigin::BreachSimulation,
            kind.detail(affected_records),
        )
        .with_recommendation(kind.recommendation())
        .with_compliance_reference(kind.compliance_reference());
        let violation_id = self.record_violation(violation).await?;

        info!(actor = %ctx.actor, %kind, affected_records, %violation_id, "Breach simulated");
        self.record_for(
            ctx,
            ActivityType::BreachSimulated,
            format!("Data breach simulation initiated: {}", kind),
            Some(format!("Affected records: {}", affected_records)),
        )
        .await;

        Ok(BreachOutcome {
            violation_id,
            kind,
            violation_type: kind.violation_type().to_string(),
            severity: kind.severity(),
            affected_records,
        })
    }
}
