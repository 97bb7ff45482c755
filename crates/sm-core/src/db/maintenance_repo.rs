//! Whole-database maintenance.
//!
//! Operations here span every table and run as one transaction, so a failure
//! part way leaves the database as it was.

use super::{DbError, DbPool};
use crate::directory::DirectoryEntry;
use async_trait::async_trait;

#[cfg(feature = "database")]
use super::directory_repo::{PgDirectoryRepository, SqliteDirectoryRepository};

/// Rows removed by [`MaintenanceRepository::reset_all`], per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetCounts {
    pub assignments: u64,
    pub violations: u64,
    pub activity: u64,
    pub directory: u64,
}

/// Repository trait for cross-table maintenance.
#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    /// Empties every table, then inserts `directory`.
    async fn reset_all(&self, directory: &[DirectoryEntry]) -> Result<ResetCounts, DbError>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of MaintenanceRepository.
#[cfg(feature = "database")]
pub struct SqliteMaintenanceRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteMaintenanceRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl MaintenanceRepository for SqliteMaintenanceRepository {
    async fn reset_all(&self, directory: &[DirectoryEntry]) -> Result<ResetCounts, DbError> {
        let mut tx = self.pool.begin().await?;

        let assignments = sqlx::query("DELETE FROM assignments")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let violations = sqlx::query("DELETE FROM violations")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let activity = sqlx::query("DELETE FROM activity_log")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let removed_entries = sqlx::query("DELETE FROM directory_entries")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for entry in directory {
            SqliteDirectoryRepository::insert(&mut *tx, entry).await?;
        }

        tx.commit().await?;
        Ok(ResetCounts {
            assignments,
            violations,
            activity,
            directory: removed_entries,
        })
    }
}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

/// PostgreSQL implementation of MaintenanceRepository.
#[cfg(feature = "database")]
pub struct PgMaintenanceRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgMaintenanceRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl MaintenanceRepository for PgMaintenanceRepository {
    async fn reset_all(&self, directory: &[DirectoryEntry]) -> Result<ResetCounts, DbError> {
        let mut tx = self.pool.begin().await?;

        let assignments = sqlx::query("DELETE FROM assignments")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let violations = sqlx::query("DELETE FROM violations")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let activity = sqlx::query("DELETE FROM activity_log")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let removed_entries = sqlx::query("DELETE FROM directory_entries")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for entry in directory {
            PgDirectoryRepository::insert(&mut *tx, entry).await?;
        }

        tx.commit().await?;
        Ok(ResetCounts {
            assignments,
            violations,
            activity,
            directory: removed_entries,
        })
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_maintenance_repository(pool: &DbPool) -> Box<dyn MaintenanceRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteMaintenanceRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgMaintenanceRepository::new(pool.clone())),
    }
}
