//! Violation store operations: recording, listing and lifecycle changes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::ComplianceService;
use crate::activity::ActivityType;
use crate::auth::ActorContext;
use crate::error::{ComplianceError, ComplianceResult};
use crate::violation::{
    DeadlineStatus, NewViolation, ViolationFilter, ViolationRecord, ViolationStatus,
    ViolationView,
};

/// Acknowledgement of a lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub violation_id: Uuid,
    pub status: ViolationStatus,
    /// `false` when the record was already in the requested state.
    pub changed: bool,
}

impl ComplianceService {
    /// Encrypts the detail and stores a new unresolved violation.
    pub async fn record_violation(&self, new: NewViolation) -> ComplianceResult<Uuid> {
        let record = self.seal(new)?;
        self.violations.create(&record).await?;
        Ok(record.id)
    }

    pub(crate) fn seal(&self, new: NewViolation) -> ComplianceResult<ViolationRecord> {
        let encrypted = self.cipher.encrypt(&new.detail)?;
        Ok(new.into_record(encrypted))
    }

    /// Lists violations with their details decrypted.
    ///
    /// `All` and `ExcludeScanner` are administrative views. `ScannerOnly` is
    /// open to every actor. `OwnedBy` is open to that nurse and to
    /// administrators, and carries each row's deadline status.
    pub async fn list_violations(
        &self,
        ctx: &ActorContext,
        filter: &ViolationFilter,
    ) -> ComplianceResult<Vec<ViolationView>> {
        match filter {
            ViolationFilter::All | ViolationFilter::ExcludeScanner => {
                ctx.require_admin("view all violations")?;
            }
            ViolationFilter::ScannerOnly => {}
            ViolationFilter::OwnedBy(nurse) => {
                if !ctx.is_admin() && &ctx.actor != nurse {
                    return Err(ComplianceError::Forbidden(format!(
                        "'{}' may not view violations of '{}'",
                        ctx.actor, nurse
                    )));
                }
            }
        }

        let records = self.violations.list(filter).await?;
        let today = Utc::now().date_naive();
        let with_deadline = matches!(filter, ViolationFilter::OwnedBy(_));

        Ok(records
            .into_iter()
            .map(|record| {
                let deadline = with_deadline.then(|| DeadlineStatus::compute(&record, today));
                let detail = self.cipher.decrypt_or_placeholder(&record.encrypted_detail);
                ViolationView {
                    deadline,
                    ..ViolationView::from_record(record, detail)
                }
            })
            .collect())
    }

    /// Acknowledges a violation on behalf of its owning nurse.
    pub async fn acknowledge_violation(
        &self,
        ctx: &ActorContext,
        violation_id: Uuid,
    ) -> ComplianceResult<Ack> {
        let record = self.load_violation(violation_id).await?;

        if !ctx.is_nurse() || record.owning_nurse.as_deref() != Some(ctx.actor.as_str()) {
            return Err(ComplianceError::Forbidden(format!(
                "violation {} is not assigned to '{}'",
                violation_id, ctx.actor
            )));
        }

        let status = if record.status == ViolationStatus::Unresolved
            && self
                .violations
                .acknowledge(violation_id, &ctx.actor, Utc::now())
                .await?
        {
            info!(%violation_id, actor = %ctx.actor, "Violation acknowledged");
            self.record_for(
                ctx,
                ActivityType::ViolationAcknowledged,
                format!(
                    "Acknowledged {} violation: {}",
                    record.severity, record.violation_type
                ),
                Some(format!("Violation ID: {}", violation_id)),
            )
            .await;
            return Ok(Ack {
                violation_id,
                status: ViolationStatus::Acknowledged,
                changed: true,
            });
        } else if record.status == ViolationStatus::Unresolved {
            // changed underneath us
            self.load_violation(violation_id).await?.status
        } else {
            record.status
        };

        match status {
            ViolationStatus::Acknowledged => Ok(Ack {
                violation_id,
                status,
                changed: false,
            }),
            _ => Err(ComplianceError::InvalidState(format!(
                "violation {} is {} and cannot be acknowledged",
                violation_id, status
            ))),
        }
    }

    /// Marks a violation resolved. Administrators only.
    pub async fn resolve_violation(
        &self,
        ctx: &ActorContext,
        violation_id: Uuid,
    ) -> ComplianceResult<Ack> {
        ctx.require_admin("resolve violations")?;
        let record = self.load_violation(violation_id).await?;

        let changed = self.violations.resolve(violation_id).await?;
        if changed {
            info!(%violation_id, actor = %ctx.actor, "Violation resolved");
            self.record_for(
                ctx,
                ActivityType::ViolationResolved,
                format!(
                    "Resolved {} violation: {}",
                    record.severity, record.violation_type
                ),
                Some(format!("Violation ID: {}", violation_id)),
            )
            .await;
        }

        Ok(Ack {
            violation_id,
            status: ViolationStatus::Resolved,
            changed,
        })
    }

    /// Returns every violation to unresolved. Administrators only.
    pub async fn reset_violation_statuses(&self, ctx: &ActorContext) -> ComplianceResult<u64> {
        ctx.require_admin("reset violation statuses")?;

        let count = self.violations.reset_all_statuses().await?;
        info!(actor = %ctx.actor, count, "Violation statuses reset");
        self.record_for(
            ctx,
            ActivityType::ViolationsReset,
            format!("Reset {} violations to Unresolved", count),
            None,
        )
        .await;

        Ok(count)
    }

    async fn load_violation(&self, violation_id: Uuid) -> ComplianceResult<ViolationRecord> {
        self.violations
            .get(violation_id)
            .await?
            .ok_or_else(|| ComplianceError::not_found("Violation", violation_id))
    }
}
