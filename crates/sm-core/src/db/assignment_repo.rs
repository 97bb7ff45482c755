//! Assignment repository for database operations.
//!
//! Terminal transitions are conditional UPDATEs guarded on
//! `status = 'pending'`, so an assignment is verified at most once even under
//! concurrent submissions. A failed verification writes its violation in the
//! same transaction as the status change.

use super::directory_repo::channel_from_db_str;
#[cfg(feature = "database")]
use super::violation_repo::{PgViolationRepository, SqliteViolationRepository};
use super::{DbError, DbPool};
use crate::assignment::{Assignment, AssignmentFilter, AssignmentStatus};
use crate::violation::ViolationRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository trait for assignment persistence.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Inserts a batch of assignments in a single transaction.
    async fn create_batch(&self, assignments: &[Assignment]) -> Result<(), DbError>;

    /// Gets an assignment by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Assignment>, DbError>;

    /// Lists assignments matching the filter, newest first.
    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, DbError>;

    /// Moves a pending assignment to a terminal status.
    ///
    /// Returns `false` when the assignment was no longer pending.
    async fn complete_pending(
        &self,
        id: Uuid,
        status: AssignmentStatus,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DbError>;

    /// Moves a pending assignment to failed and inserts `violation`, both or
    /// neither.
    ///
    /// Returns `false`, writing nothing, when the assignment was no longer
    /// pending.
    async fn fail_pending_with_violation(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        violation: &ViolationRecord,
    ) -> Result<bool, DbError>;

}

fn status_from_db_str(s: &str) -> Result<AssignmentStatus, DbError> {
    match s {
        "pending" => Ok(AssignmentStatus::Pending),
        "completed" => Ok(AssignmentStatus::Completed),
        "failed" => Ok(AssignmentStatus::Failed),
        _ => Err(DbError::unknown_variant("assignment status", s)),
    }
}

fn push_filter_clauses(
    query: &mut String,
    filter: &AssignmentFilter,
    placeholder: &mut dyn FnMut() -> String,
) {
    let mut conditions = Vec::new();

    if filter.assigned_to.is_some() {
        conditions.push(format!("assigned_to = {}", placeholder()));
    }
    if let Some(statuses) = &filter.status {
        if !statuses.is_empty() {
            let placeholders: Vec<String> = statuses.iter().map(|_| placeholder()).collect();
            conditions.push(format!("status IN ({})", placeholders.join(", ")));
        }
    }

    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, channel, patient_identifier, expected_target_value, description,
           assigned_by, assigned_to, status, created_at, completed_at, compliance_reference
    FROM assignments
"#;

// ============================================================================
// SQLite Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: String,
    channel: String,
    patient_identifier: String,
    expected_target_value: String,
    description: String,
    assigned_by: String,
    assigned_to: String,
    status: String,
    created_at: String,
    completed_at: Option<String>,
    compliance_reference: String,
}

#[cfg(feature = "database")]
impl TryFrom<AssignmentRow> for Assignment {
    type Error = DbError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Assignment {
            id: super::parse_uuid(&row.id)?,
            channel: channel_from_db_str(&row.channel)?,
            patient_identifier: row.patient_identifier,
            expected_target_value: row.expected_target_value,
            description: row.description,
            assigned_by: row.assigned_by,
            assigned_to: row.assigned_to,
            status: status_from_db_str(&row.status)?,
            created_at: super::parse_timestamp(&row.created_at)?,
            completed_at: row
                .completed_at
                .as_deref()
                .map(super::parse_timestamp)
                .transpose()?,
            compliance_reference: row.compliance_reference,
        })
    }
}

/// SQLite implementation of AssignmentRepository.
#[cfg(feature = "database")]
pub struct SqliteAssignmentRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteAssignmentRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AssignmentRepository for SqliteAssignmentRepository {
    async fn create_batch(&self, assignments: &[Assignment]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for assignment in assignments {
            sqlx::query(
                r#"
                INSERT INTO assignments (
                    id, channel, patient_identifier, expected_target_value, description,
                    assigned_by, assigned_to, status, created_at, completed_at, compliance_reference
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(assignment.id.to_string())
            .bind(assignment.channel.as_db_str())
            .bind(&assignment.patient_identifier)
            .bind(&assignment.expected_target_value)
            .bind(&assignment.description)
            .bind(&assignment.assigned_by)
            .bind(&assignment.assigned_to)
            .bind(assignment.status.as_db_str())
            .bind(super::encode_timestamp(&assignment.created_at))
            .bind(assignment.completed_at.as_ref().map(super::encode_timestamp))
            .bind(&assignment.compliance_reference)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Assignment>, DbError> {
        let query = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row: Option<AssignmentRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, DbError> {
        let mut query = String::from(SELECT_COLUMNS);
        push_filter_clauses(&mut query, filter, &mut || "?".to_string());
        query.push_str(" ORDER BY created_at DESC");

        let mut query_builder = sqlx::query_as::<_, AssignmentRow>(&query);
        if let Some(assigned_to) = &filter.assigned_to {
            query_builder = query_builder.bind(assigned_to.clone());
        }
        if let Some(statuses) = &filter.status {
            for status in statuses {
                query_builder = query_builder.bind(status.as_db_str());
            }
        }

        let rows = query_builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn complete_pending(
        &self,
        id: Uuid,
        status: AssignmentStatus,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE assignments SET status = ?, completed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_db_str())
        .bind(super::encode_timestamp(&completed_at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fail_pending_with_violation(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        violation: &ViolationRecord,
    ) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE assignments SET status = 'failed', completed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(super::encode_timestamp(&completed_at))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        SqliteViolationRepository::insert(&mut *tx, violation).await?;
        tx.commit().await?;
        Ok(true)
    }

}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgAssignmentRow {
    id: Uuid,
    channel: String,
    patient_identifier: String,
    expected_target_value: String,
    description: String,
    assigned_by: String,
    assigned_to: String,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    compliance_reference: String,
}

#[cfg(feature = "database")]
impl TryFrom<PgAssignmentRow> for Assignment {
    type Error = DbError;

    fn try_from(row: PgAssignmentRow) -> Result<Self, Self::Error> {
        Ok(Assignment {
            id: row.id,
            channel: channel_from_db_str(&row.channel)?,
            patient_identifier: row.patient_identifier,
            expected_target_value: row.expected_target_value,
            description: row.description,
            assigned_by: row.assigned_by,
            assigned_to: row.assigned_to,
            status: status_from_db_str(&row.status)?,
            created_at: row.created_at,
            completed_at: row.completed_at,
            compliance_reference: row.compliance_reference,
        })
    }
}

/// PostgreSQL implementation of AssignmentRepository.
#[cfg(feature = "database")]
pub struct PgAssignmentRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgAssignmentRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AssignmentRepository for PgAssignmentRepository {
    async fn create_batch(&self, assignments: &[Assignment]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for assignment in assignments {
            sqlx::query(
                r#"
                INSERT INTO assignments (
                    id, channel, patient_identifier, expected_target_value, description,
                    assigned_by, assigned_to, status, created_at, completed_at, compliance_reference
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(assignment.id)
            .bind(assignment.channel.as_db_str())
            .bind(&assignment.patient_identifier)
            .bind(&assignment.expected_target_value)
            .bind(&assignment.description)
            .bind(&assignment.assigned_by)
            .bind(&assignment.assigned_to)
            .bind(assignment.status.as_db_str())
            .bind(assignment.created_at)
            .bind(assignment.completed_at)
            .bind(&assignment.compliance_reference)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Assignment>, DbError> {
        let query = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let row: Option<PgAssignmentRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, DbError> {
        let mut query = String::from(SELECT_COLUMNS);
        let mut index = 0;
        push_filter_clauses(&mut query, filter, &mut || {
            index += 1;
            format!("${}", index)
        });
        query.push_str(" ORDER BY created_at DESC");

        let mut query_builder = sqlx::query_as::<_, PgAssignmentRow>(&query);
        if let Some(assigned_to) = &filter.assigned_to {
            query_builder = query_builder.bind(assigned_to.clone());
        }
        if let Some(statuses) = &filter.status {
            for status in statuses {
                query_builder = query_builder.bind(status.as_db_str());
            }
        }

        let rows = query_builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn complete_pending(
        &self,
        id: Uuid,
        status: AssignmentStatus,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE assignments SET status = $1, completed_at = $2
            WHERE id = $3 AND status = 'pending'
            "#,
        )
        .bind(status.as_db_str())
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fail_pending_with_violation(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        violation: &ViolationRecord,
    ) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE assignments SET status = 'failed', completed_at = $1
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(completed_at)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        PgViolationRepository::insert(&mut *tx, violation).await?;
        tx.commit().await?;
        Ok(true)
    }

}

// ============================================================================
// Factory
// ============================================================================

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_assignment_repository(pool: &DbPool) -> Box<dyn AssignmentRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteAssignmentRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgAssignmentRepository::new(pool.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_clauses_sqlite_placeholders() {
        let filter = AssignmentFilter {
            assigned_to: Some("ana".to_string()),
            status: Some(vec![AssignmentStatus::Pending, AssignmentStatus::Failed]),
        };
        let mut query = String::from("SELECT * FROM assignments");
        push_filter_clauses(&mut query, &filter, &mut || "?".to_string());

        assert_eq!(
            query,
            "SELECT * FROM assignments WHERE assigned_to = ? AND status IN (?, ?)"
        );
    }

    #[test]
    fn test_filter_clauses_numbered_placeholders() {
        let filter = AssignmentFilter {
            assigned_to: Some("ana".to_string()),
            status: Some(vec![AssignmentStatus::Completed]),
        };
        let mut query = String::new();
        let mut index = 0;
        push_filter_clauses(&mut query, &filter, &mut || {
            index += 1;
            format!("${}", index)
        });

        assert_eq!(query, " WHERE assigned_to = $1 AND status IN ($2)");
    }

    #[test]
    fn test_empty_filter_adds_nothing() {
        let mut query = String::from("SELECT 1");
        push_filter_clauses(&mut query, &AssignmentFilter::default(), &mut || "?".to_string());
        assert_eq!(query, "SELECT 1");
    }

    #[test]
    fn test_status_from_db_str() {
        assert_eq!(status_from_db_str("failed").unwrap(), AssignmentStatus::Failed);
        assert!(matches!(
            status_from_db_str("archived"),
            Err(DbError::Serialization(_))
        ));
    }
}
