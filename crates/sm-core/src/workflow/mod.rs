//! Compliance workflow service.
//!
//! [`ComplianceService`] is the single entry point for every operation: it
//! holds the repositories and the detail cipher, checks the caller's
//! [`ActorContext`](crate::auth::ActorContext), and writes the activity
//! ledger as a side effect of each state change. Operations are split by
//! concern across the submodules.

mod audit_trail;
mod breach;
mod generator;
mod reset;
mod seed;
mod training;
mod verifier;
mod violations;

pub use breach::{BreachKind, BreachOutcome, DEFAULT_AFFECTED_RECORDS};
pub use generator::{plan_assignments, GenerationSummary};
pub use reset::ResetSummary;
pub use seed::{
    compliance_findings, nurse_incidents, scanner_findings, SeedFinding, SYSTEM_ACTOR,
};
pub use training::{QuizAnswer, QuizResult};
pub use verifier::{submission_matches, VerificationOutcome};
pub use violations::Ack;

use std::sync::Arc;

use crate::assignment::{Assignment, AssignmentFilter};
use crate::auth::ActorContext;
use crate::crypto::DetailCipher;
use crate::db::{
    ActivityRepository, AssignmentRepository, DirectoryRepository, MaintenanceRepository,
    ViolationRepository,
};
use crate::directory::DirectoryEntry;
use crate::error::ComplianceResult;

/// Behavioural switches for the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Trim surrounding whitespace from submitted values before comparing.
    pub trim_submission: bool,
}

/// The compliance workflow service.
#[derive(Clone)]
pub struct ComplianceService {
    directory: Arc<dyn DirectoryRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    violations: Arc<dyn ViolationRepository>,
    activity: Arc<dyn ActivityRepository>,
    maintenance: Arc<dyn MaintenanceRepository>,
    cipher: Arc<dyn DetailCipher>,
    config: ServiceConfig,
}

impl ComplianceService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        violations: Arc<dyn ViolationRepository>,
        activity: Arc<dyn ActivityRepository>,
        maintenance: Arc<dyn MaintenanceRepository>,
        cipher: Arc<dyn DetailCipher>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            directory,
            assignments,
            violations,
            activity,
            maintenance,
            cipher,
            config,
        }
    }

    /// Builds the service over SQL repositories for the given pool.
    #[cfg(feature = "database")]
    pub fn from_pool(
        pool: &crate::db::DbPool,
        cipher: Arc<dyn DetailCipher>,
        config: ServiceConfig,
    ) -> Self {
        use crate::db::{
            create_activity_repository, create_assignment_repository,
            create_directory_repository, create_maintenance_repository,
            create_violation_repository,
        };

        Self::new(
            Arc::from(create_directory_repository(pool)),
            Arc::from(create_assignment_repository(pool)),
            Arc::from(create_violation_repository(pool)),
            Arc::from(create_activity_repository(pool)),
            Arc::from(create_maintenance_repository(pool)),
            cipher,
            config,
        )
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Lists the approved-destination directory, ordered by channel then name.
    pub async fn list_directory(&self) -> ComplianceResult<Vec<DirectoryEntry>> {
        Ok(self.directory.list().await?)
    }

    /// Lists assignments visible to the caller: all of them for an
    /// administrator, only their own for a nurse.
    pub async fn list_assignments(&self, ctx: &ActorContext) -> ComplianceResult<Vec<Assignment>> {
        let filter = if ctx.is_admin() {
            AssignmentFilter::default()
        } else {
            AssignmentFilter {
                assigned_to: Some(ctx.actor.clone()),
                ..Default::default()
            }
        };
        Ok(self.assignments.list(&filter).await?)
    }
}
