//! Demo reset.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ComplianceService;
use crate::activity::ActivityType;
use crate::auth::ActorContext;
use crate::directory::default_directory;
use crate::error::ComplianceResult;

/// Rows removed and re-created by a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub assignments_deleted: u64,
    pub violations_deleted: u64,
    pub activity_deleted: u64,
    pub directory_deleted: u64,
    pub directory_seeded: usize,
}

impl ComplianceService {
    /// Clears every table and re-seeds the standard directory in one
    /// transaction. Administrators only.
    ///
    /// The reset itself is the first entry of the fresh ledger.
    pub async fn reset_demo(&self, ctx: &ActorContext) -> ComplianceResult<ResetSummary> {
        ctx.require_admin("reset the demo database")?;

        let entries = default_directory();
        let counts = self.maintenance.reset_all(&entries).await?;

        let summary = ResetSummary {
            assignments_deleted: counts.assignments,
            violations_deleted: counts.violations,
            activity_deleted: counts.activity,
            directory_deleted: counts.directory,
            directory_seeded: entries.len(),
        };
        info!(actor = %ctx.actor, ?summary, "Demo database reset");

        self.record_for(
            ctx,
            ActivityType::DemoReset,
            "Database reset to demo state",
            Some("All data cleared, directory re-initialized".to_string()),
        )
        .await;

        Ok(summary)
    }
}
