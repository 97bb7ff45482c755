//! Mock implementation of AssignmentRepository for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::MockViolationRepository;
use crate::assignment::{Assignment, AssignmentFilter, AssignmentStatus};
use crate::db::{AssignmentRepository, DbError, ViolationRepository};
use crate::violation::ViolationRecord;

/// Mock implementation of AssignmentRepository using in-memory storage.
///
/// Failed verifications write their violation into the linked violation
/// mock, keeping the assignment pending when that insert fails.
pub struct MockAssignmentRepository {
    assignments: Arc<RwLock<HashMap<Uuid, Assignment>>>,
    violations: Arc<MockViolationRepository>,
}

impl Default for MockAssignmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssignmentRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self::with_assignments(Vec::new())
    }

    /// Creates a mock repository pre-populated with assignments.
    pub fn with_assignments(assignments: Vec<Assignment>) -> Self {
        let map = assignments.into_iter().map(|a| (a.id, a)).collect();
        Self {
            assignments: Arc::new(RwLock::new(map)),
            violations: Arc::new(MockViolationRepository::new()),
        }
    }

    /// Creates an empty mock that records violations into `violations`.
    pub fn linked_to(violations: Arc<MockViolationRepository>) -> Self {
        Self {
            assignments: Arc::new(RwLock::new(HashMap::new())),
            violations,
        }
    }

    /// Gets a snapshot of all assignments in the mock.
    pub async fn snapshot(&self) -> Vec<Assignment> {
        self.assignments.read().await.values().cloned().collect()
    }

    /// Removes everything, returning how many items were held.
    pub async fn clear(&self) -> u64 {
        let mut stored = self.assignments.write().await;
        let removed = stored.len() as u64;
        stored.clear();
        removed
    }
}

#[async_trait]
impl AssignmentRepository for MockAssignmentRepository {
    async fn create_batch(&self, assignments: &[Assignment]) -> Result<(), DbError> {
        let mut stored = self.assignments.write().await;

        // all-or-nothing, like the SQL transaction
        if let Some(dup) = assignments.iter().find(|a| stored.contains_key(&a.id)) {
            return Err(DbError::Constraint(format!(
                "assignment {} already exists",
                dup.id
            )));
        }
        for assignment in assignments {
            stored.insert(assignment.id, assignment.clone());
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Assignment>, DbError> {
        Ok(self.assignments.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, DbError> {
        let stored = self.assignments.read().await;
        let mut result: Vec<Assignment> = stored
            .values()
            .filter(|a| {
                filter
                    .assigned_to
                    .as_ref()
                    .map_or(true, |to| &a.assigned_to == to)
            })
            .filter(|a| {
                filter
                    .status
                    .as_ref()
                    .map_or(true, |s| s.is_empty() || s.contains(&a.status))
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn complete_pending(
        &self,
        id: Uuid,
        status: AssignmentStatus,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let mut stored = self.assignments.write().await;
        match stored.get_mut(&id) {
            Some(assignment) if assignment.status == AssignmentStatus::Pending => {
                assignment.status = status;
                assignment.completed_at = Some(completed_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_pending_with_violation(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        violation: &ViolationRecord,
    ) -> Result<bool, DbError> {
        let mut stored = self.assignments.write().await;
        match stored.get_mut(&id) {
            Some(assignment) if assignment.status == AssignmentStatus::Pending => {
                self.violations.create(violation).await?;
                assignment.status = AssignmentStatus::Failed;
                assignment.completed_at = Some(completed_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

}
