//! Append-only activity ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of entries returned by an audit trail query without an explicit limit.
pub const DEFAULT_AUDIT_LIMIT: u32 = 100;

/// Kind of recorded activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    AssignmentsGenerated,
    AssignmentCompleted,
    AssignmentFailed,
    ViolationAcknowledged,
    ViolationResolved,
    ViolationsReset,
    DirectorySeeded,
    ScannerFindingsSeeded,
    ComplianceFindingsSeeded,
    NurseIncidentsSeeded,
    TrainingCompleted,
    BreachSimulated,
    DemoReset,
}

impl ActivityType {
    /// Stable database representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ActivityType::AssignmentsGenerated => "assignments_generated",
            ActivityType::AssignmentCompleted => "assignment_completed",
            ActivityType::AssignmentFailed => "assignment_failed",
            ActivityType::ViolationAcknowledged => "violation_acknowledged",
            ActivityType::ViolationResolved => "violation_resolved",
            ActivityType::ViolationsReset => "violations_reset",
            ActivityType::DirectorySeeded => "directory_seeded",
            ActivityType::ScannerFindingsSeeded => "scanner_findings_seeded",
            ActivityType::ComplianceFindingsSeeded => "compliance_findings_seeded",
            ActivityType::NurseIncidentsSeeded => "nurse_incidents_seeded",
            ActivityType::TrainingCompleted => "training_completed",
            ActivityType::BreachSimulated => "breach_simulated",
            ActivityType::DemoReset => "demo_reset",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str().to_uppercase())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    /// Accepts both the database form and the upper-case display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assignments_generated" => Ok(ActivityType::AssignmentsGenerated),
            "assignment_completed" => Ok(ActivityType::AssignmentCompleted),
            "assignment_failed" => Ok(ActivityType::AssignmentFailed),
            "violation_acknowledged" => Ok(ActivityType::ViolationAcknowledged),
            "violation_resolved" => Ok(ActivityType::ViolationResolved),
            "violations_reset" => Ok(ActivityType::ViolationsReset),
            "directory_seeded" => Ok(ActivityType::DirectorySeeded),
            "scanner_findings_seeded" => Ok(ActivityType::ScannerFindingsSeeded),
            "compliance_findings_seeded" => Ok(ActivityType::ComplianceFindingsSeeded),
            "nurse_incidents_seeded" => Ok(ActivityType::NurseIncidentsSeeded),
            "training_completed" => Ok(ActivityType::TrainingCompleted),
            "breach_simulated" => Ok(ActivityType::BreachSimulated),
            "demo_reset" => Ok(ActivityType::DemoReset),
            _ => Err(format!("Unknown activity type: {}", s)),
        }
    }
}

/// One entry in the activity ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action_type: ActivityType,
    pub description: String,
    pub detail: Option<String>,
    pub origin_address: Option<String>,
}

impl ActivityLogEntry {
    pub fn new(
        actor: impl Into<String>,
        action_type: ActivityType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: actor.into(),
            action_type,
            description: description.into(),
            detail: None,
            origin_address: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_origin(mut self, origin_address: Option<String>) -> Self {
        self.origin_address = origin_address;
        self
    }
}

/// Audit trail query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFilter {
    pub action_type: Option<ActivityType>,
    pub actor: Option<String>,
    pub limit: u32,
}

impl Default for ActivityFilter {
    fn default() -> Self {
        Self {
            action_type: None,
            actor: None,
            limit: DEFAULT_AUDIT_LIMIT,
        }
    }
}

impl ActivityFilter {
    pub fn matches(&self, entry: &ActivityLogEntry) -> bool {
        self.action_type.map_or(true, |t| entry.action_type == t)
            && self.actor.as_ref().map_or(true, |a| &entry.actor == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_display_and_parse() {
        assert_eq!(
            ActivityType::AssignmentsGenerated.to_string(),
            "ASSIGNMENTS_GENERATED"
        );
        assert_eq!(
            "ASSIGNMENT_FAILED".parse::<ActivityType>().unwrap(),
            ActivityType::AssignmentFailed
        );
        assert_eq!(
            "demo_reset".parse::<ActivityType>().unwrap(),
            ActivityType::DemoReset
        );
        assert!("LOGIN".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_filter_defaults_and_matching() {
        let filter = ActivityFilter::default();
        assert_eq!(filter.limit, DEFAULT_AUDIT_LIMIT);

        let entry = ActivityLogEntry::new("ana", ActivityType::AssignmentCompleted, "done")
            .with_detail("Patient: MRN1001");
        assert!(filter.matches(&entry));

        let by_type = ActivityFilter {
            action_type: Some(ActivityType::AssignmentFailed),
            ..Default::default()
        };
        assert!(!by_type.matches(&entry));

        let by_actor = ActivityFilter {
            actor: Some("ana".to_string()),
            ..Default::default()
        };
        assert!(by_actor.matches(&entry));
    }
}
