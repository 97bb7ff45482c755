//! Assignment generation.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::ComplianceService;
use crate::activity::ActivityType;
use crate::assignment::Assignment;
use crate::auth::ActorContext;
use crate::directory::{ChannelType, DirectoryEntry};
use crate::error::{ComplianceError, ComplianceResult};

/// Result of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub created_count: usize,
    pub assignment_ids: Vec<Uuid>,
}

/// Plans one assignment per patient.
///
/// Each assignment gets a channel chosen uniformly from all channels, an
/// assignee chosen uniformly from `nurses`, and a target chosen uniformly
/// from the directory entries of that channel. A channel without entries
/// yields a placeholder assignment. Returns nothing when `nurses` is empty.
pub fn plan_assignments<R: Rng + ?Sized>(
    rng: &mut R,
    directory: &[DirectoryEntry],
    patients: &[String],
    nurses: &[String],
    assigned_by: &str,
) -> Vec<Assignment> {
    let mut planned = Vec::with_capacity(patients.len());

    for patient in patients {
        let Some(channel) = ChannelType::ALL.choose(rng).copied() else {
            break;
        };
        let Some(nurse) = nurses.choose(rng) else {
            break;
        };

        let candidates: Vec<&DirectoryEntry> =
            directory.iter().filter(|e| e.channel == channel).collect();

        let assignment = match candidates.choose(rng) {
            Some(entry) => {
                Assignment::for_entry(entry, patient.as_str(), assigned_by, nurse.as_str())
            }
            None => {
                Assignment::with_placeholder(channel, patient.as_str(), assigned_by, nurse.as_str())
            }
        };
        planned.push(assignment);
    }

    planned
}

impl ComplianceService {
    /// Creates one pending assignment per patient identifier.
    ///
    /// Administrators only. The batch is stored atomically.
    pub async fn generate_assignments(
        &self,
        ctx: &ActorContext,
        patient_pool: &[String],
        nurse_pool: &[String],
    ) -> ComplianceResult<GenerationSummary> {
        ctx.require_admin("generate assignments")?;

        if patient_pool.is_empty() || nurse_pool.is_empty() {
            return Err(ComplianceError::InvalidState(
                "No nurses or patients available".to_string(),
            ));
        }

        let directory = self.directory.list().await?;

        let planned = {
            let mut rng = rand::thread_rng();
            plan_assignments(&mut rng, &directory, patient_pool, nurse_pool, &ctx.actor)
        };

        self.assignments.create_batch(&planned).await?;

        let created_count = planned.len();
        info!(
            actor = %ctx.actor,
            created_count,
            "Generated assignments"
        );

        self.record_for(
            ctx,
            ActivityType::AssignmentsGenerated,
            format!("Generated {} assignments", created_count),
            Some(format!(
                "Patients: {}, Nurses: {}",
                patient_pool.join(", "),
                nurse_pool.join(", ")
            )),
        )
        .await;

        Ok(GenerationSummary {
            created_count,
            assignment_ids: planned.iter().map(|a| a.id).collect(),
        })
    }
}
