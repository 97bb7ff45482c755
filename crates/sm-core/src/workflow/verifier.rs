//! Assignment verification.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::ComplianceService;
use crate::activity::ActivityType;
use crate::assignment::{Assignment, AssignmentStatus};
use crate::auth::ActorContext;
use crate::error::{ComplianceError, ComplianceResult};
use crate::violation::{NewViolation, Severity, ViolationOrigin};

/// Result of verifying a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: AssignmentStatus,
    /// Set when the submission was wrong and a violation was recorded.
    pub violation_id: Option<Uuid>,
}

/// Case-insensitive exact comparison of a submission against the expected value.
pub fn submission_matches(submitted: &str, expected: &str, trim: bool) -> bool {
    let submitted = if trim { submitted.trim() } else { submitted };
    submitted.to_lowercase() == expected.to_lowercase()
}

impl ComplianceService {
    /// Checks a nurse's submitted value for one of their pending assignments.
    ///
    /// A match completes the assignment. A mismatch fails it and records a
    /// high-severity violation owned by the nurse in the same write, so a
    /// failed assignment always has its violation. Either way the transition
    /// happens at most once: a concurrent or repeated submission gets
    /// `InvalidState`.
    pub async fn complete_assignment(
        &self,
        ctx: &ActorContext,
        assignment_id: Uuid,
        submitted_value: &str,
    ) -> ComplianceResult<VerificationOutcome> {
        let assignment = self
            .assignments
            .get(assignment_id)
            .await?
            .ok_or_else(|| ComplianceError::not_found("Assignment", assignment_id))?;

        ctx.require_nurse("complete assignments")?;
        if assignment.assigned_to != ctx.actor {
            return Err(ComplianceError::Forbidden(format!(
                "assignment {} is not assigned to '{}'",
                assignment_id, ctx.actor
            )));
        }

        if assignment.status != AssignmentStatus::Pending {
            return Err(already_verified(&assignment));
        }

        let matched = submission_matches(
            submitted_value,
            &assignment.expected_target_value,
            self.config.trim_submission,
        );

        if matched {
            if !self
                .assignments
                .complete_pending(assignment_id, AssignmentStatus::Completed, Utc::now())
                .await?
            {
                warn!(%assignment_id, actor = %ctx.actor, "Assignment verified concurrently");
                return Err(already_verified(&assignment));
            }

            info!(%assignment_id, actor = %ctx.actor, "Assignment completed");
            self.record_for(
                ctx,
                ActivityType::AssignmentCompleted,
                format!(
                    "Completed assignment #{}: {}",
                    assignment.short_id(),
                    assignment.description
                ),
                Some(format!("Patient: {}", assignment.patient_identifier)),
            )
            .await;

            return Ok(VerificationOutcome {
                status: AssignmentStatus::Completed,
                violation_id: None,
            });
        }

        // Sealed before the status change so a cipher error leaves it pending.
        let violation = self.seal(
            NewViolation::new(
                format!("Incorrect {}", assignment.channel.as_db_str().to_uppercase()),
                Severity::High,
                ViolationOrigin::NurseVerificationFailure,
                format!(
                    "Nurse {} submitted incorrect value '{}' (expected '{}') for task: {}",
                    ctx.actor,
                    submitted_value,
                    assignment.expected_target_value,
                    assignment.description
                ),
            )
            .with_recommendation("Review training and directory")
            .with_compliance_reference(assignment.compliance_reference.clone())
            .owned_by(ctx.actor.clone()),
        )?;
        let violation_id = violation.id;

        if !self
            .assignments
            .fail_pending_with_violation(assignment_id, Utc::now(), &violation)
            .await?
        {
            warn!(%assignment_id, actor = %ctx.actor, "Assignment verified concurrently");
            return Err(already_verified(&assignment));
        }

        info!(%assignment_id, %violation_id, actor = %ctx.actor, "Assignment failed verification");
        self.record_for(
            ctx,
            ActivityType::AssignmentFailed,
            format!(
                "Failed assignment #{}: Incorrect value submitted",
                assignment.short_id()
            ),
            Some(format!(
                "Task: {}, Expected: {}, Got: {}",
                assignment.description, assignment.expected_target_value, submitted_value
            )),
        )
        .await;

        Ok(VerificationOutcome {
            status: AssignmentStatus::Failed,
            violation_id: Some(violation_id),
        })
    }
}

fn already_verified(assignment: &Assignment) -> ComplianceError {
    ComplianceError::InvalidState(format!(
        "assignment {} has already been verified",
        assignment.id
    ))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ServiceConfig;
    use super::*;
    use crate::activity::ActivityType;
    use crate::crypto::DetailCipher;
    use crate::db::AssignmentRepository;
    use crate::directory::{ChannelType, DirectoryEntry};
    use crate::violation::ViolationStatus;

    async fn seed_assignment(h: &Harness, nurse: &str, target: &str) -> Assignment {
        let entry = DirectoryEntry::new(ChannelType::Fax, "City General", target, "Cardiology", "");
        let assignment = Assignment::for_entry(&entry, "MRN1001", "admin", nurse);
        h.assignments
            .create_batch(std::slice::from_ref(&assignment))
            .await
            .unwrap();
        assignment
    }

    #[test]
    fn test_submission_matches() {
        assert!(submission_matches("555-1234", "555-1234", false));
        assert!(submission_matches(
            "RECORDS@SecureMed.internal",
            "records@securemed.internal",
            false
        ));
        assert!(!submission_matches("555-1234 ", "555-1234", false));
        assert!(submission_matches(" 555-1234 ", "555-1234", true));
        assert!(!submission_matches("555-1235", "555-1234", true));
        // Unicode case folding, not just ASCII
        assert!(submission_matches("STRASSE ÄRZTE", "strasse ärzte", false));
    }

    #[tokio::test]
    async fn test_correct_value_completes_without_violation() {
        let h = harness();
        let assignment = seed_assignment(&h, "ana", "(555) 892-1155").await;

        let outcome = h
            .service
            .complete_assignment(&ActorContext::nurse("ana"), assignment.id, "(555) 892-1155")
            .await
            .unwrap();

        assert_eq!(outcome.status, AssignmentStatus::Completed);
        assert!(outcome.violation_id.is_none());
        assert!(h.violations.snapshot().await.is_empty());

        let stored = h.assignments.get(assignment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssignmentStatus::Completed);
        assert!(stored.completed_at.is_some());

        let log = h.activity.snapshot().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action_type, ActivityType::AssignmentCompleted);
        assert_eq!(log[0].detail.as_deref(), Some("Patient: MRN1001"));
    }

    #[tokio::test]
    async fn test_wrong_value_fails_and_records_one_violation() {
        let h = harness();
        let assignment = seed_assignment(&h, "ana", "555-1234").await;

        let outcome = h
            .service
            .complete_assignment(&ActorContext::nurse("ana"), assignment.id, "555-0000")
            .await
            .unwrap();

        assert_eq!(outcome.status, AssignmentStatus::Failed);
        let violations = h.violations.snapshot().await;
        assert_eq!(violations.len(), 1);

        let violation = &violations[0];
        assert_eq!(Some(violation.id), outcome.violation_id);
        assert_eq!(violation.violation_type, "Incorrect FAX");
        assert_eq!(violation.severity, Severity::High);
        assert_eq!(violation.origin, ViolationOrigin::NurseVerificationFailure);
        assert_eq!(violation.status, ViolationStatus::Unresolved);
        assert_eq!(violation.owning_nurse.as_deref(), Some("ana"));
        assert_eq!(violation.recommendation, "Review training and directory");
        assert_eq!(violation.compliance_reference, "164.312(e)(1)");

        assert!(!violation.encrypted_detail.contains("555-0000"));
        assert_eq!(
            h.cipher.decrypt(&violation.encrypted_detail).unwrap(),
            format!(
                "Nurse ana submitted incorrect value '555-0000' (expected '555-1234') for task: {}",
                assignment.description
            )
        );

        let log = h.activity.snapshot().await;
        assert_eq!(log[0].action_type, ActivityType::AssignmentFailed);
        assert!(log[0]
            .detail
            .as_deref()
            .unwrap()
            .ends_with("Expected: 555-1234, Got: 555-0000"));
    }

    #[tokio::test]
    async fn test_trailing_whitespace_depends_on_trim_policy() {
        let strict = harness();
        let assignment = seed_assignment(&strict, "ana", "555-1234").await;
        let outcome = strict
            .service
            .complete_assignment(&ActorContext::nurse("ana"), assignment.id, "555-1234 ")
            .await
            .unwrap();
        assert_eq!(outcome.status, AssignmentStatus::Failed);

        let lenient = harness_with(
            Vec::new(),
            ServiceConfig {
                trim_submission: true,
            },
        );
        let assignment = seed_assignment(&lenient, "ana", "555-1234").await;
        let outcome = lenient
            .service
            .complete_assignment(&ActorContext::nurse("ana"), assignment.id, "555-1234 ")
            .await
            .unwrap();
        assert_eq!(outcome.status, AssignmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_second_verification_is_rejected() {
        let h = harness();
        let assignment = seed_assignment(&h, "ana", "555-1234").await;
        let ana = ActorContext::nurse("ana");

        h.service
            .complete_assignment(&ana, assignment.id, "wrong")
            .await
            .unwrap();
        let second = h
            .service
            .complete_assignment(&ana, assignment.id, "555-1234")
            .await;

        assert!(matches!(second, Err(ComplianceError::InvalidState(_))));
        let stored = h.assignments.get(assignment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssignmentStatus::Failed);
        assert_eq!(h.violations.snapshot().await.len(), 1);
    }

    /// Serves a stale pending copy on read, as if another submission
    /// completed the assignment after it was loaded.
    struct StaleReads {
        inner: crate::db::mocks::MockAssignmentRepository,
        stale: Assignment,
    }

    #[async_trait::async_trait]
    impl AssignmentRepository for StaleReads {
        async fn create_batch(
            &self,
            assignments: &[Assignment],
        ) -> Result<(), crate::db::DbError> {
            self.inner.create_batch(assignments).await
        }

        async fn get(&self, _id: Uuid) -> Result<Option<Assignment>, crate::db::DbError> {
            Ok(Some(self.stale.clone()))
        }

        async fn list(
            &self,
            filter: &crate::assignment::AssignmentFilter,
        ) -> Result<Vec<Assignment>, crate::db::DbError> {
            self.inner.list(filter).await
        }

        async fn complete_pending(
            &self,
            id: Uuid,
            status: AssignmentStatus,
            completed_at: chrono::DateTime<Utc>,
        ) -> Result<bool, crate::db::DbError> {
            self.inner.complete_pending(id, status, completed_at).await
        }

        async fn fail_pending_with_violation(
            &self,
            id: Uuid,
            completed_at: chrono::DateTime<Utc>,
            violation: &crate::violation::ViolationRecord,
        ) -> Result<bool, crate::db::DbError> {
            self.inner
                .fail_pending_with_violation(id, completed_at, violation)
                .await
        }
    }

    #[tokio::test]
    async fn test_lost_race_creates_no_violation() {
        let h = harness();
        let entry = DirectoryEntry::new(ChannelType::Email, "Records", "records@x", "", "");
        let stale = Assignment::for_entry(&entry, "MRN7", "admin", "ana");
        let mut winner = stale.clone();
        winner.status = AssignmentStatus::Completed;
        winner.completed_at = Some(Utc::now());

        let service = ComplianceService::new(
            h.directory.clone(),
            std::sync::Arc::new(StaleReads {
                inner: crate::db::mocks::MockAssignmentRepository::with_assignments(vec![winner]),
                stale: stale.clone(),
            }),
            h.violations.clone(),
            h.activity.clone(),
            h.maintenance.clone(),
            h.cipher.clone(),
            ServiceConfig::default(),
        );

        let result = service
            .complete_assignment(&ActorContext::nurse("ana"), stale.id, "wrong value")
            .await;

        assert!(matches!(result, Err(ComplianceError::InvalidState(_))));
        assert!(h.violations.snapshot().await.is_empty());
        assert!(h.activity.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_violation_insert_keeps_assignment_pending() {
        let h = harness();
        let assignment = seed_assignment(&h, "ana", "555-1234").await;
        let ana = ActorContext::nurse("ana");

        h.violations.set_fail_writes(true);
        let first = h
            .service
            .complete_assignment(&ana, assignment.id, "555-0000")
            .await;
        assert!(matches!(first, Err(ComplianceError::Database(_))));

        let stored = h.assignments.get(assignment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssignmentStatus::Pending);
        assert!(stored.completed_at.is_none());
        assert!(h.violations.snapshot().await.is_empty());
        assert!(h.activity.snapshot().await.is_empty());

        // the same wrong answer is still recorded once the store recovers
        h.violations.set_fail_writes(false);
        let retry = h
            .service
            .complete_assignment(&ana, assignment.id, "555-0000")
            .await
            .unwrap();
        assert_eq!(retry.status, AssignmentStatus::Failed);

        let violations = h.violations.snapshot().await;
        assert_eq!(violations.len(), 1);
        assert_eq!(Some(violations[0].id), retry.violation_id);

        let log = h.activity.snapshot().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action_type, ActivityType::AssignmentFailed);
    }

    #[tokio::test]
    async fn test_only_assignee_may_complete() {
        let h = harness();
        let assignment = seed_assignment(&h, "ana", "555-1234").await;

        let other_nurse = h
            .service
            .complete_assignment(&ActorContext::nurse("jordan"), assignment.id, "555-1234")
            .await;
        assert!(matches!(other_nurse, Err(ComplianceError::Forbidden(_))));

        let admin = h
            .service
            .complete_assignment(&ActorContext::admin("ana"), assignment.id, "555-1234")
            .await;
        assert!(matches!(admin, Err(ComplianceError::Forbidden(_))));

        let stored = h.assignments.get(assignment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssignmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_assignment_is_not_found() {
        let h = harness();
        let result = h
            .service
            .complete_assignment(&ActorContext::nurse("ana"), Uuid::new_v4(), "x")
            .await;
        assert!(matches!(result, Err(ComplianceError::NotFound { .. })));
    }
}
