//! Activity repository for database operations.
//!
//! This module provides persistence for the append-only activity ledger,
//! supporting both SQLite and PostgreSQL backends.

use super::{DbError, DbPool};
use crate::activity::{ActivityFilter, ActivityLogEntry, ActivityType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository trait for activity persistence.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Appends an entry.
    async fn create(&self, entry: &ActivityLogEntry) -> Result<(), DbError>;

    /// Lists entries matching the filter, newest first, up to `filter.limit`.
    async fn list(&self, filter: &ActivityFilter) -> Result<Vec<ActivityLogEntry>, DbError>;

}

// Helper function to parse ActivityType from database string.
fn activity_type_from_db_str(s: &str) -> Result<ActivityType, DbError> {
    match s {
        "assignments_generated" => Ok(ActivityType::AssignmentsGenerated),
        "assignment_completed" => Ok(ActivityType::AssignmentCompleted),
        "assignment_failed" => Ok(ActivityType::AssignmentFailed),
        "violation_acknowledged" => Ok(ActivityType::ViolationAcknowledged),
        "violation_resolved" => Ok(ActivityType::ViolationResolved),
        "violations_reset" => Ok(ActivityType::ViolationsReset),
        "directory_seeded" => Ok(ActivityType::DirectorySeeded),
        "scanner_findings_seeded" => Ok(ActivityType::ScannerFindingsSeeded),
        "compliance_findings_seeded" => Ok(ActivityType::ComplianceFindingsSeeded),
        "nurse_incidents_seeded" => Ok(ActivityType::NurseIncidentsSeeded),
        "training_completed" => Ok(ActivityType::TrainingCompleted),
        "breach_simulated" => Ok(ActivityType::BreachSimulated),
        "demo_reset" => Ok(ActivityType::DemoReset),
        _ => Err(DbError::unknown_variant("activity type", s)),
    }
}

fn where_clause(filter: &ActivityFilter, placeholder: &mut dyn FnMut() -> String) -> String {
    let mut conditions = Vec::new();
    if filter.action_type.is_some() {
        conditions.push(format!("action_type = {}", placeholder()));
    }
    if filter.actor.is_some() {
        conditions.push(format!("actor = {}", placeholder()));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

// ============================================================================
// SQLite Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    timestamp: String,
    actor: String,
    action_type: String,
    description: String,
    detail: Option<String>,
    origin_address: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<ActivityRow> for ActivityLogEntry {
    type Error = DbError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(ActivityLogEntry {
            id: super::parse_uuid(&row.id)?,
            timestamp: super::parse_timestamp(&row.timestamp)?,
            actor: row.actor,
            action_type: activity_type_from_db_str(&row.action_type)?,
            description: row.description,
            detail: row.detail,
            origin_address: row.origin_address,
        })
    }
}

/// SQLite implementation of ActivityRepository.
#[cfg(feature = "database")]
pub struct SqliteActivityRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteActivityRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ActivityRepository for SqliteActivityRepository {
    async fn create(&self, entry: &ActivityLogEntry) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (
                id, timestamp, actor, action_type, description, detail, origin_address
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(super::encode_timestamp(&entry.timestamp))
        .bind(&entry.actor)
        .bind(entry.action_type.as_db_str())
        .bind(&entry.description)
        .bind(&entry.detail)
        .bind(&entry.origin_address)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &ActivityFilter) -> Result<Vec<ActivityLogEntry>, DbError> {
        let query = format!(
            r#"
            SELECT id, timestamp, actor, action_type, description, detail, origin_address
            FROM activity_log{}
            ORDER BY timestamp DESC LIMIT ?
            "#,
            where_clause(filter, &mut || "?".to_string())
        );

        let mut query_builder = sqlx::query_as::<_, ActivityRow>(&query);
        if let Some(action_type) = filter.action_type {
            query_builder = query_builder.bind(action_type.as_db_str());
        }
        if let Some(actor) = &filter.actor {
            query_builder = query_builder.bind(actor.clone());
        }
        query_builder = query_builder.bind(filter.limit as i64);

        let rows: Vec<ActivityRow> = query_builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgActivityRow {
    id: Uuid,
    timestamp: DateTime<Utc>,
    actor: String,
    action_type: String,
    description: String,
    detail: Option<String>,
    origin_address: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<PgActivityRow> for ActivityLogEntry {
    type Error = DbError;

    fn try_from(row: PgActivityRow) -> Result<Self, Self::Error> {
        Ok(ActivityLogEntry {
            id: row.id,
            timestamp: row.timestamp,
            actor: row.actor,
            action_type: activity_type_from_db_str(&row.action_type)?,
            description: row.description,
            detail: row.detail,
            origin_address: row.origin_address,
        })
    }
}

/// PostgreSQL implementation of ActivityRepository.
#[cfg(feature = "database")]
pub struct PgActivityRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgActivityRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn create(&self, entry: &ActivityLogEntry) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (
                id, timestamp, actor, action_type, description, detail, origin_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(&entry.actor)
        .bind(entry.action_type.as_db_str())
        .bind(&entry.description)
        .bind(&entry.detail)
        .bind(&entry.origin_address)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &ActivityFilter) -> Result<Vec<ActivityLogEntry>, DbError> {
        let mut index = 0;
        let mut next = || {
            index += 1;
            format!("${}", index)
        };
        let clause = where_clause(filter, &mut next);
        let limit_placeholder = next();
        let query = format!(
            r#"
            SELECT id, timestamp, actor, action_type, description, detail, origin_address
            FROM activity_log{}
            ORDER BY timestamp DESC LIMIT {}
            "#,
            clause, limit_placeholder
        );

        let mut query_builder = sqlx::query_as::<_, PgActivityRow>(&query);
        if let Some(action_type) = filter.action_type {
            query_builder = query_builder.bind(action_type.as_db_str());
        }
        if let Some(actor) = &filter.actor {
            query_builder = query_builder.bind(actor.clone());
        }
        query_builder = query_builder.bind(filter.limit as i64);

        let rows: Vec<PgActivityRow> = query_builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

}

// ============================================================================
// Factory
// ============================================================================

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_activity_repository(pool: &DbPool) -> Box<dyn ActivityRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteActivityRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgActivityRepository::new(pool.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause() {
        assert_eq!(
            where_clause(&ActivityFilter::default(), &mut || "?".to_string()),
            ""
        );

        let filter = ActivityFilter {
            action_type: Some(ActivityType::AssignmentFailed),
            actor: Some("ana".to_string()),
            limit: 10,
        };
        let mut index = 0;
        let clause = where_clause(&filter, &mut || {
            index += 1;
            format!("${}", index)
        });
        assert_eq!(clause, " WHERE action_type = $1 AND actor = $2");
    }

    #[test]
    fn test_activity_type_db_roundtrip() {
        for s in ["assignments_generated", "breach_simulated", "demo_reset"] {
            assert_eq!(activity_type_from_db_str(s).unwrap().as_db_str(), s);
        }
        assert!(activity_type_from_db_str("LOGIN").is_err());
    }
}
