//! Mock implementation of MaintenanceRepository for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{
    MockActivityRepository, MockAssignmentRepository, MockDirectoryRepository,
    MockViolationRepository,
};
use crate::db::{DbError, DirectoryRepository, MaintenanceRepository, ResetCounts};
use crate::directory::DirectoryEntry;

/// Resets the other in-memory mocks.
///
/// In failing mode `reset_all` errors before touching any store.
pub struct MockMaintenanceRepository {
    directory: Arc<MockDirectoryRepository>,
    assignments: Arc<MockAssignmentRepository>,
    violations: Arc<MockViolationRepository>,
    activity: Arc<MockActivityRepository>,
    fail_writes: AtomicBool,
}

impl MockMaintenanceRepository {
    pub fn new(
        directory: Arc<MockDirectoryRepository>,
        assignments: Arc<MockAssignmentRepository>,
        violations: Arc<MockViolationRepository>,
        activity: Arc<MockActivityRepository>,
    ) -> Self {
        Self {
            directory,
            assignments,
            violations,
            activity,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MaintenanceRepository for MockMaintenanceRepository {
    async fn reset_all(&self, directory: &[DirectoryEntry]) -> Result<ResetCounts, DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Connection("database unavailable".to_string()));
        }

        let counts = ResetCounts {
            assignments: self.assignments.clear().await,
            violations: self.violations.clear().await,
            activity: self.activity.clear().await,
            directory: self.directory.clear().await,
        };
        self.directory.insert_many(directory).await?;
        Ok(counts)
    }
}
