//! Mock implementation of ViolationRepository for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{DbError, ViolationRepository};
use crate::violation::{ViolationFilter, ViolationOrigin, ViolationRecord, ViolationStatus};

/// Mock implementation of ViolationRepository using in-memory storage.
///
/// Records are kept in insertion order; listings return them newest first.
/// Inserts can be switched to fail, leaving the store untouched.
pub struct MockViolationRepository {
    records: Arc<RwLock<Vec<ViolationRecord>>>,
    fail_writes: AtomicBool,
}

impl Default for MockViolationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockViolationRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Creates a mock repository pre-populated with records.
    pub fn with_records(records: Vec<ViolationRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every insert fail with a connection error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Connection("violation store unavailable".to_string()));
        }
        Ok(())
    }

    /// Gets a snapshot of all records in insertion order.
    pub async fn snapshot(&self) -> Vec<ViolationRecord> {
        self.records.read().await.clone()
    }

    /// Removes everything, returning how many items were held.
    pub async fn clear(&self) -> u64 {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        removed
    }
}

#[async_trait]
impl ViolationRepository for MockViolationRepository {
    async fn create(&self, record: &ViolationRecord) -> Result<(), DbError> {
        self.create_many(std::slice::from_ref(record)).await
    }

    async fn create_many(&self, new_records: &[ViolationRecord]) -> Result<(), DbError> {
        self.check_writable()?;
        let mut records = self.records.write().await;

        // all-or-nothing, like the SQL transaction
        for (i, record) in new_records.iter().enumerate() {
            let clash = records.iter().any(|r| r.id == record.id)
                || new_records[..i].iter().any(|r| r.id == record.id);
            if clash {
                return Err(DbError::Constraint(format!(
                    "violation {} already exists",
                    record.id
                )));
            }
        }
        records.extend_from_slice(new_records);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ViolationRecord>, DbError> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>, DbError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn acknowledge(
        &self,
        id: Uuid,
        acknowledged_by: &str,
        acknowledged_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) if record.status == ViolationStatus::Unresolved => {
                record.status = ViolationStatus::Acknowledged;
                record.acknowledged_at = Some(acknowledged_at);
                record.acknowledged_by = Some(acknowledged_by.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn resolve(&self, id: Uuid) -> Result<bool, DbError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) if record.status != ViolationStatus::Resolved => {
                record.status = ViolationStatus::Resolved;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_all_statuses(&self) -> Result<u64, DbError> {
        let mut records = self.records.write().await;
        for record in records.iter_mut() {
            record.status = ViolationStatus::Unresolved;
            record.acknowledged_at = None;
            record.acknowledged_by = None;
        }
        Ok(records.len() as u64)
    }

    async fn replace_origin(
        &self,
        origin: ViolationOrigin,
        new_records: &[ViolationRecord],
    ) -> Result<u64, DbError> {
        self.check_writable()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.origin != origin);
        let deleted = (before - records.len()) as u64;
        records.extend_from_slice(new_records);
        Ok(deleted)
    }

}
