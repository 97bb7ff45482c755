//! Mock implementation of ActivityRepository for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::activity::{ActivityFilter, ActivityLogEntry};
use crate::db::{ActivityRepository, DbError};

/// Mock implementation of ActivityRepository using in-memory storage.
///
/// Can be switched into a failing mode to exercise callers that must
/// tolerate ledger write failures.
pub struct MockActivityRepository {
    entries: Arc<RwLock<Vec<ActivityLogEntry>>>,
    fail_writes: AtomicBool,
}

impl Default for MockActivityRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockActivityRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Creates a mock whose writes fail with a connection error.
    pub fn failing() -> Self {
        let repo = Self::new();
        repo.set_fail_writes(true);
        repo
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Gets a snapshot of all entries in insertion order.
    pub async fn snapshot(&self) -> Vec<ActivityLogEntry> {
        self.entries.read().await.clone()
    }

    /// Removes everything, returning how many items were held.
    pub async fn clear(&self) -> u64 {
        let mut entries = self.entries.write().await;
        let removed = entries.len() as u64;
        entries.clear();
        removed
    }
}

#[async_trait]
impl ActivityRepository for MockActivityRepository {
    async fn create(&self, entry: &ActivityLogEntry) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Connection("activity log unavailable".to_string()));
        }
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(&self, filter: &ActivityFilter) -> Result<Vec<ActivityLogEntry>, DbError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

}
