//! Activity ledger writes and the administrative audit trail query.

use tracing::{debug, error};

use super::ComplianceService;
use crate::activity::{ActivityFilter, ActivityLogEntry, ActivityType};
use crate::auth::ActorContext;
use crate::error::ComplianceResult;

impl ComplianceService {
    /// Appends an entry to the activity ledger.
    ///
    /// Never fails: a storage error is logged and dropped so that the
    /// operation being recorded is not rolled back by its own audit write.
    pub async fn record(
        &self,
        actor: &str,
        action_type: ActivityType,
        description: impl Into<String>,
        detail: Option<String>,
        origin_address: Option<String>,
    ) {
        let mut entry =
            ActivityLogEntry::new(actor, action_type, description).with_origin(origin_address);
        entry.detail = detail;

        if let Err(e) = self.activity.create(&entry).await {
            error!(
                error = %e,
                actor = %entry.actor,
                action_type = %entry.action_type,
                "Failed to write activity log entry"
            );
        }
    }

    /// Records an entry on behalf of the calling actor.
    pub(crate) async fn record_for(
        &self,
        ctx: &ActorContext,
        action_type: ActivityType,
        description: impl Into<String>,
        detail: Option<String>,
    ) {
        self.record(
            &ctx.actor,
            action_type,
            description,
            detail,
            ctx.origin_address.clone(),
        )
        .await;
    }

    /// Returns ledger entries newest first. Administrators only.
    pub async fn audit_trail(
        &self,
        ctx: &ActorContext,
        filter: &ActivityFilter,
    ) -> ComplianceResult<Vec<ActivityLogEntry>> {
        ctx.require_admin("view the audit trail")?;
        debug!(?filter, "Querying audit trail");
        Ok(self.activity.list(filter).await?)
    }
}
