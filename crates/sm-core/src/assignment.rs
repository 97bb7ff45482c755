//! Nurse task assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::directory::{ChannelType, DirectoryEntry};

/// Target value used when a channel has no directory entries.
pub const PLACEHOLDER_TARGET: &str = "555-XXXX";

/// Lifecycle of an assignment. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Failed,
}

impl AssignmentStatus {
    /// Stable database representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AssignmentStatus::Pending)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::Pending => write!(f, "Pending"),
            AssignmentStatus::Completed => write!(f, "Completed"),
            AssignmentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AssignmentStatus::Pending),
            "completed" => Ok(AssignmentStatus::Completed),
            "failed" => Ok(AssignmentStatus::Failed),
            _ => Err(format!("Unknown assignment status: {}", s)),
        }
    }
}

/// A task instructing a nurse to send a patient's information to a directory destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub channel: ChannelType,
    pub patient_identifier: String,
    /// Value the nurse is expected to submit.
    pub expected_target_value: String,
    pub description: String,
    pub assigned_by: String,
    pub assigned_to: String,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub compliance_reference: String,
}

impl Assignment {
    /// Creates a pending assignment targeting a directory entry.
    ///
    /// The description names the destination but not its value: the nurse
    /// has to look the value up in the directory.
    pub fn for_entry(
        entry: &DirectoryEntry,
        patient_identifier: impl Into<String>,
        assigned_by: impl Into<String>,
        assigned_to: impl Into<String>,
    ) -> Self {
        let patient_identifier = patient_identifier.into();
        let description = format!(
            "{} '{}' for patient {}",
            entry.channel.action_phrase(),
            entry.display_name,
            patient_identifier
        );
        Self::pending(
            entry.channel,
            patient_identifier,
            entry.target_value.clone(),
            description,
            assigned_by.into(),
            assigned_to.into(),
        )
    }

    /// Creates a pending assignment for a channel that has no directory entries.
    pub fn with_placeholder(
        channel: ChannelType,
        patient_identifier: impl Into<String>,
        assigned_by: impl Into<String>,
        assigned_to: impl Into<String>,
    ) -> Self {
        let patient_identifier = patient_identifier.into();
        let description = format!(
            "{} approved location for patient {}",
            channel.action_phrase(),
            patient_identifier
        );
        Self::pending(
            channel,
            patient_identifier,
            PLACEHOLDER_TARGET.to_string(),
            description,
            assigned_by.into(),
            assigned_to.into(),
        )
    }

    fn pending(
        channel: ChannelType,
        patient_identifier: String,
        expected_target_value: String,
        description: String,
        assigned_by: String,
        assigned_to: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            patient_identifier,
            expected_target_value,
            description,
            assigned_by,
            assigned_to,
            status: AssignmentStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            compliance_reference: channel.compliance_reference().to_string(),
        }
    }

    /// Short form of the id used in human-readable messages.
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}

/// Which assignments a caller may see.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssignmentFilter {
    /// Restrict to one assignee.
    pub assigned_to: Option<String>,
    /// Restrict to these statuses.
    pub status: Option<Vec<AssignmentStatus>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_entry_describes_destination_by_name() {
        let entry = DirectoryEntry::new(
            ChannelType::Fax,
            "Regional Laboratory Services",
            "(555) 334-8899",
            "Laboratory",
            "",
        );
        let assignment = Assignment::for_entry(&entry, "MRN1001", "admin", "ana");

        assert_eq!(assignment.status, AssignmentStatus::Pending);
        assert_eq!(assignment.expected_target_value, "(555) 334-8899");
        assert_eq!(
            assignment.description,
            "Fax patient records to 'Regional Laboratory Services' for patient MRN1001"
        );
        assert!(!assignment.description.contains("334-8899"));
        assert_eq!(assignment.compliance_reference, "164.312(e)(1)");
        assert!(assignment.completed_at.is_none());
    }

    #[test]
    fn test_with_placeholder() {
        let assignment =
            Assignment::with_placeholder(ChannelType::Courier, "MRN2002", "admin", "jordan");

        assert_eq!(assignment.expected_target_value, PLACEHOLDER_TARGET);
        assert_eq!(
            assignment.description,
            "Send records via courier to approved location for patient MRN2002"
        );
        assert_eq!(assignment.compliance_reference, "164.310(d)(1)");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!AssignmentStatus::Pending.is_terminal());
        assert!(AssignmentStatus::Completed.is_terminal());
        assert!(AssignmentStatus::Failed.is_terminal());
        assert_eq!(
            "FAILED".parse::<AssignmentStatus>().unwrap(),
            AssignmentStatus::Failed
        );
    }
}
