//! Compliance findings and their lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Days allowed to remediate an organisational finding of this severity.
    pub fn remediation_days(&self) -> i64 {
        match self {
            Severity::Critical => 30,
            Severity::High => 60,
            Severity::Medium => 90,
            Severity::Low => 120,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Where a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationOrigin {
    /// Technical vulnerability scanner seed.
    Scanner,
    /// A nurse submitted the wrong value for an assignment.
    NurseVerificationFailure,
    /// A training quiz answer was wrong.
    TrainingFailure,
    /// Organisational HIPAA compliance seed.
    ComplianceSeed,
    /// Canned nurse-conduct incident seed.
    NurseIncident,
    /// Simulated breach incident.
    BreachSimulation,
}

impl ViolationOrigin {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ViolationOrigin::Scanner => "scanner",
            ViolationOrigin::NurseVerificationFailure => "nurse_verification_failure",
            ViolationOrigin::TrainingFailure => "training_failure",
            ViolationOrigin::ComplianceSeed => "compliance_seed",
            ViolationOrigin::NurseIncident => "nurse_incident",
            ViolationOrigin::BreachSimulation => "breach_simulation",
        }
    }
}

impl fmt::Display for ViolationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ViolationOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scanner" => Ok(ViolationOrigin::Scanner),
            "nurse_verification_failure" => Ok(ViolationOrigin::NurseVerificationFailure),
            "training_failure" => Ok(ViolationOrigin::TrainingFailure),
            "compliance_seed" => Ok(ViolationOrigin::ComplianceSeed),
            "nurse_incident" => Ok(ViolationOrigin::NurseIncident),
            "breach_simulation" => Ok(ViolationOrigin::BreachSimulation),
            _ => Err(format!("Unknown violation origin: {}", s)),
        }
    }
}

/// Lifecycle status of a finding.
///
/// `Unresolved -> Acknowledged -> Resolved`, or `Unresolved -> Resolved`.
/// The administrative reset returns any record to `Unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationStatus {
    Unresolved,
    Acknowledged,
    Resolved,
}

impl ViolationStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ViolationStatus::Unresolved => "unresolved",
            ViolationStatus::Acknowledged => "acknowledged",
            ViolationStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationStatus::Unresolved => write!(f, "Unresolved"),
            ViolationStatus::Acknowledged => write!(f, "Acknowledged"),
            ViolationStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

impl FromStr for ViolationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unresolved" => Ok(ViolationStatus::Unresolved),
            "acknowledged" => Ok(ViolationStatus::Acknowledged),
            "resolved" => Ok(ViolationStatus::Resolved),
            _ => Err(format!("Unknown violation status: {}", s)),
        }
    }
}

/// A stored finding. The detail is held only in encrypted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub id: Uuid,
    pub violation_type: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub encrypted_detail: String,
    pub recommendation: String,
    pub compliance_reference: String,
    pub origin: ViolationOrigin,
    pub status: ViolationStatus,
    pub owning_nurse: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub remediation_deadline: Option<NaiveDate>,
}

/// A finding about to be recorded, with its detail still in plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewViolation {
    pub violation_type: String,
    pub severity: Severity,
    pub detail: String,
    pub recommendation: String,
    pub compliance_reference: String,
    pub origin: ViolationOrigin,
    pub owning_nurse: Option<String>,
    pub remediation_deadline: Option<NaiveDate>,
}

impl NewViolation {
    pub fn new(
        violation_type: impl Into<String>,
        severity: Severity,
        origin: ViolationOrigin,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            violation_type: violation_type.into(),
            severity,
            detail: detail.into(),
            recommendation: String::new(),
            compliance_reference: String::new(),
            origin,
            owning_nurse: None,
            remediation_deadline: None,
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }

    pub fn with_compliance_reference(mut self, reference: impl Into<String>) -> Self {
        self.compliance_reference = reference.into();
        self
    }

    pub fn owned_by(mut self, nurse: impl Into<String>) -> Self {
        self.owning_nurse = Some(nurse.into());
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.remediation_deadline = Some(deadline);
        self
    }

    /// Builds the stored record around an already-encrypted detail.
    pub fn into_record(self, encrypted_detail: String) -> ViolationRecord {
        ViolationRecord {
            id: Uuid::new_v4(),
            violation_type: self.violation_type,
            severity: self.severity,
            timestamp: Utc::now(),
            encrypted_detail,
            recommendation: self.recommendation,
            compliance_reference: self.compliance_reference,
            origin: self.origin,
            status: ViolationStatus::Unresolved,
            owning_nurse: self.owning_nurse,
            acknowledged_at: None,
            acknowledged_by: None,
            remediation_deadline: self.remediation_deadline,
        }
    }
}

/// Which findings a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationFilter {
    /// Every finding.
    All,
    /// Everything except scanner findings.
    ExcludeScanner,
    /// Only scanner findings.
    ScannerOnly,
    /// Findings owned by one nurse.
    OwnedBy(String),
}

impl ViolationFilter {
    /// Whether a record falls inside this filter.
    pub fn matches(&self, record: &ViolationRecord) -> bool {
        match self {
            ViolationFilter::All => true,
            ViolationFilter::ExcludeScanner => record.origin != ViolationOrigin::Scanner,
            ViolationFilter::ScannerOnly => record.origin == ViolationOrigin::Scanner,
            ViolationFilter::OwnedBy(nurse) => record.owning_nurse.as_deref() == Some(nurse),
        }
    }
}

/// Remediation progress of a finding owned by a nurse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineStatus {
    /// Days left until the deadline, negative once passed. `None` without a deadline.
    pub days_until_deadline: Option<i64>,
    pub is_overdue: bool,
    pub is_acknowledged: bool,
}

impl DeadlineStatus {
    pub fn compute(record: &ViolationRecord, today: NaiveDate) -> Self {
        let days_until_deadline = record
            .remediation_deadline
            .map(|deadline| (deadline - today).num_days());
        Self {
            days_until_deadline,
            is_overdue: days_until_deadline.is_some_and(|days| days < 0),
            is_acknowledged: record.status == ViolationStatus::Acknowledged,
        }
    }
}

/// A finding as presented to a reader, with its detail decrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationView {
    pub id: Uuid,
    pub violation_type: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Plaintext detail, or the decryption placeholder.
    pub detail: String,
    pub recommendation: String,
    pub compliance_reference: String,
    pub origin: ViolationOrigin,
    pub status: ViolationStatus,
    pub owning_nurse: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub remediation_deadline: Option<NaiveDate>,
    /// Present on per-nurse listings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DeadlineStatus>,
}

impl ViolationView {
    pub fn from_record(record: ViolationRecord, detail: String) -> Self {
        Self {
            id: record.id,
            violation_type: record.violation_type,
            severity: record.severity,
            timestamp: record.timestamp,
            detail,
            recommendation: record.recommendation,
            compliance_reference: record.compliance_reference,
            origin: record.origin,
            status: record.status,
            owning_nurse: record.owning_nurse,
            acknowledged_at: record.acknowledged_at,
            acknowledged_by: record.acknowledged_by,
            remediation_deadline: record.remediation_deadline,
            deadline: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(origin: ViolationOrigin, nurse: Option<&str>) -> ViolationRecord {
        let mut new = NewViolation::new("Incorrect FAX", Severity::High, origin, "detail");
        if let Some(nurse) = nurse {
            new = new.owned_by(nurse);
        }
        new.into_record("sealed".to_string())
    }

    #[test]
    fn test_into_record_starts_unresolved() {
        let record = NewViolation::new(
            "Training Violation: phishing",
            Severity::Medium,
            ViolationOrigin::TrainingFailure,
            "Failed training scenario: phishing",
        )
        .with_recommendation("Complete additional training")
        .with_compliance_reference("164.308(a)(5)")
        .owned_by("ana")
        .into_record("ciphertext".to_string());

        assert_eq!(record.status, ViolationStatus::Unresolved);
        assert_eq!(record.encrypted_detail, "ciphertext");
        assert_eq!(record.owning_nurse.as_deref(), Some("ana"));
        assert!(record.acknowledged_at.is_none());
    }

    #[test]
    fn test_filter_matches() {
        let scanner = record(ViolationOrigin::Scanner, None);
        let nurse = record(ViolationOrigin::NurseVerificationFailure, Some("ana"));

        assert!(ViolationFilter::All.matches(&scanner));
        assert!(!ViolationFilter::ExcludeScanner.matches(&scanner));
        assert!(ViolationFilter::ExcludeScanner.matches(&nurse));
        assert!(ViolationFilter::ScannerOnly.matches(&scanner));
        assert!(ViolationFilter::OwnedBy("ana".into()).matches(&nurse));
        assert!(!ViolationFilter::OwnedBy("jordan".into()).matches(&nurse));
        assert!(!ViolationFilter::OwnedBy("ana".into()).matches(&scanner));
    }

    #[test]
    fn test_deadline_status() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut record = record(ViolationOrigin::TrainingFailure, Some("ana"));

        let none = DeadlineStatus::compute(&record, today);
        assert_eq!(none.days_until_deadline, None);
        assert!(!none.is_overdue);

        record.remediation_deadline = NaiveDate::from_ymd_opt(2024, 3, 5);
        record.status = ViolationStatus::Acknowledged;
        let overdue = DeadlineStatus::compute(&record, today);
        assert_eq!(overdue.days_until_deadline, Some(-5));
        assert!(overdue.is_overdue);
        assert!(overdue.is_acknowledged);

        record.remediation_deadline = NaiveDate::from_ymd_opt(2024, 4, 9);
        let upcoming = DeadlineStatus::compute(&record, today);
        assert_eq!(upcoming.days_until_deadline, Some(30));
        assert!(!upcoming.is_overdue);
    }

    #[test]
    fn test_remediation_days() {
        assert_eq!(Severity::Critical.remediation_days(), 30);
        assert_eq!(Severity::High.remediation_days(), 60);
        assert_eq!(Severity::Medium.remediation_days(), 90);
        assert_eq!(Severity::Low.remediation_days(), 120);
    }
}
