//! Standard directory and finding seeds.

use chrono::{Duration, NaiveDate, Utc};
use tracing::info;

use super::ComplianceService;
use crate::activity::ActivityType;
use crate::auth::ActorContext;
use crate::directory::default_directory;
use crate::error::ComplianceResult;
use crate::violation::{NewViolation, Severity, ViolationOrigin, ViolationRecord};

/// Actor recorded for seeds that run outside any caller's request.
pub const SYSTEM_ACTOR: &str = "system";

/// A canned finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedFinding {
    pub violation_type: &'static str,
    pub severity: Severity,
    pub detail: &'static str,
    pub recommendation: &'static str,
    pub compliance_reference: &'static str,
}

const fn finding(
    violation_type: &'static str,
    severity: Severity,
    detail: &'static str,
    recommendation: &'static str,
    compliance_reference: &'static str,
) -> SeedFinding {
    SeedFinding {
        violation_type,
        severity,
        detail,
        recommendation,
        compliance_reference,
    }
}

#[rustfmt::skip]
const SCANNER_FINDINGS: [SeedFinding; 5] = [
    finding("Weak Encryption", Severity::High, "MD5 used for ePHI", "Upgrade to AES-256-GCM", "164.312(a)(2)(iv)"),
    finding("No HTTPS", Severity::Critical, "Data sent via HTTP", "Enable TLS 1.3 + HSTS", "164.312(e)(1)"),
    finding("Unauthorized API Access", Severity::High, "Open /patients endpoint", "Add OAuth2 or API key", "164.308(a)(3)(ii)(B)"),
    finding("SQL Injection", Severity::Medium, "Unvalidated input", "Use parameterized queries", "164.308(a)(1)(ii)(A)"),
    finding("Insecure Dependencies", Severity::Low, "Outdated Python modules", "Run SBOM + patch/update", "164.308(a)(1)(ii)(B)"),
];

#[rustfmt::skip]
const COMPLIANCE_FINDINGS: [SeedFinding; 32] = [
    // Administrative safeguards
    finding("Missing Risk Assessment", Severity::Critical, "No HIPAA risk assessment conducted in past 12 months", "Conduct comprehensive risk assessment per 164.308(a)(1)(ii)(A)", "164.308(a)(1)(ii)(A)"),
    finding("Inadequate Workforce Training", Severity::High, "Only 40% of workforce completed HIPAA training", "Implement mandatory annual training program", "164.308(a)(5)(i)"),
    finding("No Security Officer Designated", Severity::Critical, "Organization lacks designated Security Officer", "Appoint qualified Security Officer immediately", "164.308(a)(2)"),
    finding("Missing Sanction Policy", Severity::High, "No documented sanction policy for HIPAA violations", "Create and implement sanction policy", "164.308(a)(1)(ii)(C)"),
    finding("Incomplete BAA Contracts", Severity::High, "3 vendors lack Business Associate Agreements", "Execute BAAs with all vendors handling ePHI", "164.308(b)(1)"),
    finding("No Contingency Plan", Severity::Critical, "Missing disaster recovery/contingency plan", "Develop and test contingency plan", "164.308(a)(7)(i)"),
    finding("Inadequate Access Controls", Severity::High, "No role-based access control implementation", "Implement least privilege access model", "164.308(a)(3)(i)"),
    finding("Missing Incident Response", Severity::Critical, "No breach notification procedures documented", "Create incident response plan per breach rules", "164.308(a)(6)(i)"),
    // Physical safeguards
    finding("Unrestricted Facility Access", Severity::High, "Server room lacks physical access controls", "Install badge reader and access logs", "164.310(a)(1)"),
    finding("No Workstation Security", Severity::Medium, "Unattended workstations not auto-locking", "Enable 5-minute screen lock policy", "164.310(b)"),
    finding("Missing Device Inventory", Severity::Medium, "No inventory of devices with ePHI access", "Create and maintain device inventory", "164.310(d)(1)"),
    finding("Improper Media Disposal", Severity::High, "Hard drives not sanitized before disposal", "Implement secure media disposal process", "164.310(d)(2)(i)"),
    finding("Visitor Access Not Logged", Severity::Low, "No visitor sign-in logs for secure areas", "Implement visitor management system", "164.310(a)(2)(iii)"),
    // Technical safeguards
    finding("No Unique User IDs", Severity::Critical, "Shared login credentials for staff", "Assign unique user IDs to each user", "164.312(a)(2)(i)"),
    finding("Missing Audit Controls", Severity::High, "System access not logged or monitored", "Enable comprehensive audit logging", "164.312(b)"),
    finding("Weak Authentication", Severity::Critical, "No multi-factor authentication for ePHI access", "Implement MFA for all ePHI systems", "164.312(d)"),
    finding("Unencrypted Data at Rest", Severity::Critical, "Patient database not encrypted", "Enable encryption for all ePHI at rest", "164.312(a)(2)(iv)"),
    finding("Unencrypted Transmission", Severity::Critical, "ePHI sent via unencrypted email", "Use encrypted channels (TLS 1.3+) for ePHI", "164.312(e)(1)"),
    finding("No Automatic Logoff", Severity::Medium, "Sessions don't timeout after inactivity", "Configure 15-minute session timeout", "164.312(a)(2)(iii)"),
    finding("Missing Integrity Controls", Severity::High, "No mechanism to detect data tampering", "Implement checksums/digital signatures", "164.312(c)(1)"),
    // Privacy rule
    finding("Missing Privacy Notice", Severity::High, "Patients not provided Notice of Privacy Practices", "Provide NPP to all patients at first contact", "164.520(a)"),
    finding("No Authorization Forms", Severity::Medium, "Using outdated HIPAA authorization forms", "Update forms to meet all required elements", "164.508(c)"),
    finding("Improper Minimum Necessary", Severity::High, "Staff accessing full records when not needed", "Implement minimum necessary access controls", "164.502(b)"),
    finding("Missing Patient Rights", Severity::Medium, "No process for patients to request amendments", "Create patient rights request procedures", "164.526"),
    finding("Accounting Failures", Severity::Medium, "Cannot provide accounting of disclosures", "Implement disclosure tracking system", "164.528"),
    // Breach notification
    finding("Late Breach Notification", Severity::Critical, "Breach discovered 45 days ago, not reported", "Notify HHS and affected individuals immediately", "164.408"),
    finding("Incomplete Breach Assessment", Severity::High, "No risk assessment for lost laptop", "Conduct 4-factor breach analysis", "164.402"),
    // Documentation
    finding("Missing Policies & Procedures", Severity::Critical, "HIPAA policies not documented", "Document all required policies and procedures", "164.316(a)"),
    finding("No Policy Review Process", Severity::Medium, "Policies not reviewed since 2019", "Implement annual policy review cycle", "164.316(b)(2)(iii)"),
    // Devices and vendors
    finding("Mobile Device Unencrypted", Severity::High, "Staff phones with ePHI not encrypted", "Require device encryption or MDM solution", "164.312(a)(2)(iv)"),
    finding("Cloud Storage Misconfiguration", Severity::Critical, "Patient data in unsecured S3 bucket", "Review cloud security settings and enable encryption", "164.312(a)(1)"),
    finding("Vendor Risk Not Assessed", Severity::High, "Third-party EHR vendor not audited", "Conduct vendor security assessment", "164.308(b)(1)"),
];

#[rustfmt::skip]
const NURSE_INCIDENTS: [SeedFinding; 5] = [
    finding("Emailed PHI Externally", Severity::High, "Nurse sent PHI to external email", "Retrain + DLP filters", "164.312(e)(1)"),
    finding("Unauthorized Record Access", Severity::High, "Nurse viewed patient record w/o authorization", "Revoke access + monitor logs", "164.308(a)(3)(ii)(B)"),
    finding("Improper Device Usage", Severity::Medium, "Copied PHI to personal USB", "Block removable media", "164.312(a)(2)(iv)"),
    finding("Discussed Patient Info Publicly", Severity::Low, "Spoke about PHI in hallway", "Privacy training", "164.308(a)(5)"),
    finding("Faxed PHI to Wrong Office", Severity::Medium, "Sent PHI to wrong fax #", "Add verification step", "164.312(b)"),
];

/// The standard technical scanner findings.
pub fn scanner_findings() -> &'static [SeedFinding] {
    &SCANNER_FINDINGS
}

/// The standard organisational HIPAA findings.
pub fn compliance_findings() -> &'static [SeedFinding] {
    &COMPLIANCE_FINDINGS
}

/// Canned nurse-conduct incidents. They have no owning nurse.
pub fn nurse_incidents() -> &'static [SeedFinding] {
    &NURSE_INCIDENTS
}

impl SeedFinding {
    fn to_new_violation(self, origin: ViolationOrigin) -> NewViolation {
        NewViolation::new(self.violation_type, self.severity, origin, self.detail)
            .with_recommendation(self.recommendation)
            .with_compliance_reference(self.compliance_reference)
    }

    /// Remediation deadline counted from `today`.
    pub fn deadline_from(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.severity.remediation_days())
    }
}

impl ComplianceService {
    /// Inserts the standard directory when it is empty.
    ///
    /// Returns the number of entries inserted, zero when the directory was
    /// already populated.
    pub async fn seed_directory(&self) -> ComplianceResult<usize> {
        if self.directory.count().await? > 0 {
            return Ok(0);
        }

        let entries = default_directory();
        self.directory.insert_many(&entries).await?;
        info!(count = entries.len(), "Seeded approved-destination directory");

        self.record(
            SYSTEM_ACTOR,
            ActivityType::DirectorySeeded,
            format!("Seeded {} directory entries", entries.len()),
            None,
            None,
        )
        .await;

        Ok(entries.len())
    }

    /// Replaces every scanner finding with the standard set. Administrators only.
    pub async fn seed_scanner_findings(&self, ctx: &ActorContext) -> ComplianceResult<usize> {
        ctx.require_admin("seed scanner findings")?;

        let records = scanner_findings()
            .iter()
            .map(|f| self.seal(f.to_new_violation(ViolationOrigin::Scanner)))
            .collect::<ComplianceResult<Vec<_>>>()?;

        self.replace_seeded(
            ctx,
            ViolationOrigin::Scanner,
            records,
            ActivityType::ScannerFindingsSeeded,
        )
        .await
    }

    /// Replaces every compliance-seed finding with the standard HIPAA set,
    /// each with a remediation deadline by severity. Administrators only.
    pub async fn seed_compliance_findings(&self, ctx: &ActorContext) -> ComplianceResult<usize> {
        ctx.require_admin("seed compliance findings")?;

        let today = Utc::now().date_naive();
        let records = compliance_findings()
            .iter()
            .map(|f| {
                let new = f
                    .to_new_violation(ViolationOrigin::ComplianceSeed)
                    .with_deadline(f.deadline_from(today));
                self.seal(new)
            })
            .collect::<ComplianceResult<Vec<_>>>()?;

        self.replace_seeded(
            ctx,
            ViolationOrigin::ComplianceSeed,
            records,
            ActivityType::ComplianceFindingsSeeded,
        )
        .await
    }

    /// Replaces every nurse incident with the canned set. Administrators only.
    pub async fn seed_nurse_incidents(&self, ctx: &ActorContext) -> ComplianceResult<usize> {
        ctx.require_admin("seed nurse incidents")?;

        let records = nurse_incidents()
            .iter()
            .map(|f| self.seal(f.to_new_violation(ViolationOrigin::NurseIncident)))
            .collect::<ComplianceResult<Vec<_>>>()?;

        self.replace_seeded(
            ctx,
            ViolationOrigin::NurseIncident,
            records,
            ActivityType::NurseIncidentsSeeded,
        )
        .await
    }

    async fn replace_seeded(
        &self,
        ctx: &ActorContext,
        origin: ViolationOrigin,
        records: Vec<ViolationRecord>,
        action_type: ActivityType,
    ) -> ComplianceResult<usize> {
        let removed = self.violations.replace_origin(origin, &records).await?;
        info!(
            actor = %ctx.actor,
            origin = origin.as_db_str(),
            removed,
            inserted = records.len(),
            "Replaced seeded findings"
        );

        self.record_for(
            ctx,
            action_type,
            format!("Seeded {} {} findings", records.len(), origin.as_db_str()),
            Some(format!("Replaced {} existing records", removed)),
        )
        .await;

        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ServiceConfig;
    use super::*;
    use crate::db::{DirectoryRepository, ViolationRepository};
    use crate::error::ComplianceError;
    use crate::violation::{ViolationFilter, ViolationStatus};
    use std::collections::HashSet;

    #[test]
    fn test_seed_tables() {
        assert_eq!(scanner_findings().len(), 5);
        assert_eq!(compliance_findings().len(), 32);
        assert_eq!(nurse_incidents().len(), 5);

        let types: HashSet<_> = compliance_findings().iter().map(|f| f.violation_type).collect();
        assert_eq!(types.len(), 32);
    }

    #[test]
    fn test_deadline_by_severity() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let critical = compliance_findings()[0];
        assert_eq!(critical.severity, Severity::Critical);
        assert_eq!(critical.deadline_from(today), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

        let low = compliance_findings()
            .iter()
            .find(|f| f.severity == Severity::Low)
            .unwrap();
        assert_eq!(low.deadline_from(today), today + Duration::days(120));
    }

    #[tokio::test]
    async fn test_seed_directory_only_when_empty() {
        let h = harness_with(Vec::new(), ServiceConfig::default());

        assert_eq!(h.service.seed_directory().await.unwrap(), 25);
        assert_eq!(h.directory.count().await.unwrap(), 25);
        assert_eq!(h.service.seed_directory().await.unwrap(), 0);

        let log = h.activity.snapshot().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action_type, ActivityType::DirectorySeeded);
        assert_eq!(log[0].actor, SYSTEM_ACTOR);
    }

    #[tokio::test]
    async fn test_scanner_seed_replaces_only_scanner_findings() {
        let h = harness();
        let admin = ActorContext::admin("admin");
        let own = h
            .service
            .record_violation(
                NewViolation::new(
                    "Incorrect FAX",
                    Severity::High,
                    ViolationOrigin::NurseVerificationFailure,
                    "x",
                )
                .owned_by("ana"),
            )
            .await
            .unwrap();

        assert_eq!(h.service.seed_scanner_findings(&admin).await.unwrap(), 5);
        assert_eq!(h.service.seed_scanner_findings(&admin).await.unwrap(), 5);

        let stored = h.violations.snapshot().await;
        assert_eq!(stored.len(), 6);
        assert!(stored.iter().any(|r| r.id == own));

        let views = h
            .service
            .list_violations(&ActorContext::nurse("ana"), &ViolationFilter::ScannerOnly)
            .await
            .unwrap();
        assert_eq!(views.len(), 5);
        assert!(views.iter().any(|v| v.detail == "MD5 used for ePHI"));
        assert!(views.iter().all(|v| v.remediation_deadline.is_none()));
    }

    #[tokio::test]
    async fn test_compliance_seed_sets_deadlines() {
        let h = harness();
        let admin = ActorContext::admin("admin");

        assert_eq!(h.service.seed_compliance_findings(&admin).await.unwrap(), 32);

        let today = Utc::now().date_naive();
        let stored = h.violations.list(&ViolationFilter::All).await.unwrap();
        assert_eq!(stored.len(), 32);
        for record in stored {
            assert_eq!(record.origin, ViolationOrigin::ComplianceSeed);
            assert_eq!(record.status, ViolationStatus::Unresolved);
            assert!(record.owning_nurse.is_none());
            let deadline = record.remediation_deadline.unwrap();
            let days = (deadline - today).num_days();
            assert!((days - record.severity.remediation_days()).abs() <= 1);
        }

        let log = h.activity.snapshot().await;
        assert_eq!(log[0].action_type, ActivityType::ComplianceFindingsSeeded);
    }

    #[tokio::test]
    async fn test_nurse_incidents_show_in_real_view_only() {
        let h = harness();
        let admin = ActorContext::admin("admin");

        assert_eq!(h.service.seed_nurse_incidents(&admin).await.unwrap(), 5);
        assert_eq!(h.service.seed_nurse_incidents(&admin).await.unwrap(), 5);
        h.service.seed_scanner_findings(&admin).await.unwrap();

        let real = h
            .service
            .list_violations(&admin, &ViolationFilter::ExcludeScanner)
            .await
            .unwrap();
        assert_eq!(real.len(), 5);
        assert!(real.iter().all(|v| v.origin == ViolationOrigin::NurseIncident));
        assert!(real.iter().all(|v| v.owning_nurse.is_none()));
        assert!(real
            .iter()
            .any(|v| v.violation_type == "Faxed PHI to Wrong Office"
                && v.detail == "Sent PHI to wrong fax #"));

        let stored = h.violations.snapshot().await;
        assert!(stored
            .iter()
            .all(|r| !r.encrypted_detail.contains("PHI to external email")));

        for nurse in ["ana", "jordan"] {
            let owned = h
                .service
                .list_violations(&admin, &ViolationFilter::OwnedBy(nurse.to_string()))
                .await
                .unwrap();
            assert!(owned.is_empty());
        }

        let log = h.activity.snapshot().await;
        assert_eq!(log[0].action_type, ActivityType::NurseIncidentsSeeded);
        assert_eq!(log[0].description, "Seeded 5 nurse_incident findings");
    }

    #[tokio::test]
    async fn test_seeds_require_admin() {
        let h = harness();
        let nurse = ActorContext::nurse("ana");

        assert!(matches!(
            h.service.seed_scanner_findings(&nurse).await,
            Err(ComplianceError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.seed_compliance_findings(&nurse).await,
            Err(ComplianceError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.seed_nurse_incidents(&nurse).await,
            Err(ComplianceError::Forbidden(_))
        ));
        assert!(h.violations.snapshot().await.is_empty());
    }
}
