//! Violation repository for database operations.

use super::{DbError, DbPool};
use crate::violation::{
    Severity, ViolationFilter, ViolationOrigin, ViolationRecord, ViolationStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Repository trait for violation persistence.
#[async_trait]
pub trait ViolationRepository: Send + Sync {
    /// Inserts a new violation record.
    async fn create(&self, record: &ViolationRecord) -> Result<(), DbError>;

    /// Inserts several violation records in a single transaction.
    async fn create_many(&self, records: &[ViolationRecord]) -> Result<(), DbError>;

    /// Gets a violation by ID.
    async fn get(&self, id: Uuid) -> Result<Option<ViolationRecord>, DbError>;

    /// Lists violations matching the filter, newest first.
    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>, DbError>;

    /// Moves an unresolved violation to acknowledged.
    ///
    /// Returns `false` when the violation was not unresolved.
    async fn acknowledge(
        &self,
        id: Uuid,
        acknowledged_by: &str,
        acknowledged_at: DateTime<Utc>,
    ) -> Result<bool, DbError>;

    /// Marks a violation resolved. Returns `false` when it already was.
    async fn resolve(&self, id: Uuid) -> Result<bool, DbError>;

    /// Returns every violation to unresolved and clears acknowledgements.
    async fn reset_all_statuses(&self) -> Result<u64, DbError>;

    /// Atomically deletes every violation of `origin` and inserts `records`.
    ///
    /// Returns the number of deleted rows.
    async fn replace_origin(
        &self,
        origin: ViolationOrigin,
        records: &[ViolationRecord],
    ) -> Result<u64, DbError>;

}

fn severity_from_db_str(s: &str) -> Result<Severity, DbError> {
    match s {
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        "critical" => Ok(Severity::Critical),
        _ => Err(DbError::unknown_variant("severity", s)),
    }
}

fn origin_from_db_str(s: &str) -> Result<ViolationOrigin, DbError> {
    s.parse()
        .map_err(|_| DbError::unknown_variant("violation origin", s))
}

fn status_from_db_str(s: &str) -> Result<ViolationStatus, DbError> {
    match s {
        "unresolved" => Ok(ViolationStatus::Unresolved),
        "acknowledged" => Ok(ViolationStatus::Acknowledged),
        "resolved" => Ok(ViolationStatus::Resolved),
        _ => Err(DbError::unknown_variant("violation status", s)),
    }
}

/// WHERE clause for a filter. `OwnedBy` binds one parameter.
fn filter_clause(filter: &ViolationFilter, placeholder: &str) -> String {
    match filter {
        ViolationFilter::All => String::new(),
        ViolationFilter::ExcludeScanner => " WHERE origin <> 'scanner'".to_string(),
        ViolationFilter::ScannerOnly => " WHERE origin = 'scanner'".to_string(),
        ViolationFilter::OwnedBy(_) => format!(" WHERE owning_nurse = {}", placeholder),
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, violation_type, severity, timestamp, encrypted_detail, recommendation,
           compliance_reference, origin, status, owning_nurse, acknowledged_at,
           acknowledged_by, remediation_deadline
    FROM violations
"#;

// ============================================================================
// SQLite Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct ViolationRow {
    id: String,
    violation_type: String,
    severity: String,
    timestamp: String,
    encrypted_detail: String,
    recommendation: String,
    compliance_reference: String,
    origin: String,
    status: String,
    owning_nurse: Option<String>,
    acknowledged_at: Option<String>,
    acknowledged_by: Option<String>,
    remediation_deadline: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<ViolationRow> for ViolationRecord {
    type Error = DbError;

    fn try_from(row: ViolationRow) -> Result<Self, Self::Error> {
        Ok(ViolationRecord {
            id: super::parse_uuid(&row.id)?,
            violation_type: row.violation_type,
            severity: severity_from_db_str(&row.severity)?,
            timestamp: super::parse_timestamp(&row.timestamp)?,
            encrypted_detail: row.encrypted_detail,
            recommendation: row.recommendation,
            compliance_reference: row.compliance_reference,
            origin: origin_from_db_str(&row.origin)?,
            status: status_from_db_str(&row.status)?,
            owning_nurse: row.owning_nurse,
            acknowledged_at: row
                .acknowledged_at
                .as_deref()
                .map(super::parse_timestamp)
                .transpose()?,
            acknowledged_by: row.acknowledged_by,
            remediation_deadline: row
                .remediation_deadline
                .as_deref()
                .map(super::parse_date)
                .transpose()?,
        })
    }
}

/// SQLite implementation of ViolationRepository.
#[cfg(feature = "database")]
pub struct SqliteViolationRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteViolationRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub(super) async fn insert(
        conn: &mut sqlx::SqliteConnection,
        record: &ViolationRecord,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO violations (
                id, violation_type, severity, timestamp, encrypted_detail, recommendation,
                compliance_reference, origin, status, owning_nurse, acknowledged_at,
                acknowledged_by, remediation_deadline
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.violation_type)
        .bind(record.severity.as_db_str())
        .bind(super::encode_timestamp(&record.timestamp))
        .bind(&record.encrypted_detail)
        .bind(&record.recommendation)
        .bind(&record.compliance_reference)
        .bind(record.origin.as_db_str())
        .bind(record.status.as_db_str())
        .bind(&record.owning_nurse)
        .bind(record.acknowledged_at.as_ref().map(super::encode_timestamp))
        .bind(&record.acknowledged_by)
        .bind(
            record
                .remediation_deadline
                .map(|d| d.format("%Y-%m-%d").to_string()),
        )
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ViolationRepository for SqliteViolationRepository {
    async fn create(&self, record: &ViolationRecord) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, record).await
    }

    async fn create_many(&self, records: &[ViolationRecord]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            Self::insert(&mut *tx, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ViolationRecord>, DbError> {
        let query = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row: Option<ViolationRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>, DbError> {
        let query = format!(
            "{}{} ORDER BY timestamp DESC",
            SELECT_COLUMNS,
            filter_clause(filter, "?")
        );

        let mut query_builder = sqlx::query_as::<_, ViolationRow>(&query);
        if let ViolationFilter::OwnedBy(nurse) = filter {
            query_builder = query_builder.bind(nurse.clone());
        }

        let rows = query_builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn acknowledge(
        &self,
        id: Uuid,
        acknowledged_by: &str,
        acknowledged_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE violations
            SET status = 'acknowledged', acknowledged_at = ?, acknowledged_by = ?
            WHERE id = ? AND status = 'unresolved'
            "#,
        )
        .bind(super::encode_timestamp(&acknowledged_at))
        .bind(acknowledged_by)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn resolve(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE violations SET status = 'resolved' WHERE id = ? AND status <> 'resolved'",
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_all_statuses(&self) -> Result<u64, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE violations
            SET status = 'unresolved', acknowledged_at = NULL, acknowledged_by = NULL
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn replace_origin(
        &self,
        origin: ViolationOrigin,
        records: &[ViolationRecord],
    ) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM violations WHERE origin = ?")
            .bind(origin.as_db_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            Self::insert(&mut *tx, record).await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }

}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgViolationRow {
    id: Uuid,
    violation_type: String,
    severity: String,
    timestamp: DateTime<Utc>,
    encrypted_detail: String,
    recommendation: String,
    compliance_reference: String,
    origin: String,
    status: String,
    owning_nurse: Option<String>,
    acknowledged_at: Option<DateTime<Utc>>,
    acknowledged_by: Option<String>,
    remediation_deadline: Option<NaiveDate>,
}

#[cfg(feature = "database")]
impl TryFrom<PgViolationRow> for ViolationRecord {
    type Error = DbError;

    fn try_from(row: PgViolationRow) -> Result<Self, Self::Error> {
        Ok(ViolationRecord {
            id: row.id,
            violation_type: row.violation_type,
            severity: severity_from_db_str(&row.severity)?,
            timestamp: row.timestamp,
            encrypted_detail: row.encrypted_detail,
            recommendation: row.recommendation,
            compliance_reference: row.compliance_reference,
            origin: origin_from_db_str(&row.origin)?,
            status: status_from_db_str(&row.status)?,
            owning_nurse: row.owning_nurse,
            acknowledged_at: row.acknowledged_at,
            acknowledged_by: row.acknowledged_by,
            remediation_deadline: row.remediation_deadline,
        })
    }
}

/// PostgreSQL implementation of ViolationRepository.
#[cfg(feature = "database")]
pub struct PgViolationRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgViolationRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub(super) async fn insert(
        conn: &mut sqlx::PgConnection,
        record: &ViolationRecord,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO violations (
                id, violation_type, severity, timestamp, encrypted_detail, recommendation,
                compliance_reference, origin, status, owning_nurse, acknowledged_at,
                acknowledged_by, remediation_deadline
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(&record.violation_type)
        .bind(record.severity.as_db_str())
        .bind(record.timestamp)
        .bind(&record.encrypted_detail)
        .bind(&record.recommendation)
        .bind(&record.compliance_reference)
        .bind(record.origin.as_db_str())
        .bind(record.status.as_db_str())
        .bind(&record.owning_nurse)
        .bind(record.acknowledged_at)
        .bind(&record.acknowledged_by)
        .bind(record.remediation_deadline)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ViolationRepository for PgViolationRepository {
    async fn create(&self, record: &ViolationRecord) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, record).await
    }

    async fn create_many(&self, records: &[ViolationRecord]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            Self::insert(&mut *tx, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ViolationRecord>, DbError> {
        let query = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let row: Option<PgViolationRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>, DbError> {
        let query = format!(
            "{}{} ORDER BY timestamp DESC",
            SELECT_COLUMNS,
            filter_clause(filter, "$1")
        );

        let mut query_builder = sqlx::query_as::<_, PgViolationRow>(&query);
        if let ViolationFilter::OwnedBy(nurse) = filter {
            query_builder = query_builder.bind(nurse.clone());
        }

        let rows = query_builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn acknowledge(
        &self,
        id: Uuid,
        acknowledged_by: &str,
        acknowledged_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE violations
            SET status = 'acknowledged', acknowledged_at = $1, acknowledged_by = $2
            WHERE id = $3 AND status = 'unresolved'
            "#,
        )
        .bind(acknowledged_at)
        .bind(acknowledged_by)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn resolve(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE violations SET status = 'resolved' WHERE id = $1 AND status <> 'resolved'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_all_statuses(&self) -> Result<u64, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE violations
            SET status = 'unresolved', acknowledged_at = NULL, acknowledged_by = NULL
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn replace_origin(
        &self,
        origin: ViolationOrigin,
        records: &[ViolationRecord],
    ) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM violations WHERE origin = $1")
            .bind(origin.as_db_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            Self::insert(&mut *tx, record).await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }

}

// ============================================================================
// Factory
// ============================================================================

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_violation_repository(pool: &DbPool) -> Box<dyn ViolationRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteViolationRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgViolationRepository::new(pool.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_clause() {
        assert_eq!(filter_clause(&ViolationFilter::All, "?"), "");
        assert_eq!(
            filter_clause(&ViolationFilter::ExcludeScanner, "?"),
            " WHERE origin <> 'scanner'"
        );
        assert_eq!(
            filter_clause(&ViolationFilter::ScannerOnly, "$1"),
            " WHERE origin = 'scanner'"
        );
        assert_eq!(
            filter_clause(&ViolationFilter::OwnedBy("ana".into()), "$1"),
            " WHERE owning_nurse = $1"
        );
    }

    #[test]
    fn test_db_str_parsers_reject_unknown_values() {
        assert_eq!(severity_from_db_str("critical").unwrap(), Severity::Critical);
        assert_eq!(
            origin_from_db_str("breach_simulation").unwrap(),
            ViolationOrigin::BreachSimulation
        );
        assert!(matches!(
            origin_from_db_str("hipaa_compliance"),
            Err(DbError::Serialization(_))
        ));
        assert!(matches!(
            status_from_db_str("Unresolved"),
            Err(DbError::Serialization(_))
        ));
    }
}
