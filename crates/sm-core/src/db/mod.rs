//! Database layer for SecureMed.
//!
//! This module provides persistence for the destination directory,
//! assignments, violations and the activity ledger using SQLx with support
//! for both SQLite and PostgreSQL. Repository traits are always available;
//! the SQL-backed implementations require the `database` feature.

mod error;
pub mod mocks;
mod pool;
mod schema;

pub mod activity_repo;
pub mod assignment_repo;
pub mod directory_repo;
pub mod maintenance_repo;
pub mod violation_repo;

pub use error::DbError;
pub use pool::{create_pool, create_pool_with_options, DbPool, PoolOptions};
pub use schema::run_migrations;

// Re-export repository traits
pub use activity_repo::ActivityRepository;
pub use assignment_repo::AssignmentRepository;
pub use directory_repo::DirectoryRepository;
pub use maintenance_repo::{MaintenanceRepository, ResetCounts};
pub use violation_repo::ViolationRepository;

// Re-export factory functions
#[cfg(feature = "database")]
pub use activity_repo::create_activity_repository;
#[cfg(feature = "database")]
pub use assignment_repo::create_assignment_repository;
#[cfg(feature = "database")]
pub use directory_repo::create_directory_repository;
#[cfg(feature = "database")]
pub use maintenance_repo::create_maintenance_repository;
#[cfg(feature = "database")]
pub use violation_repo::create_violation_repository;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

// SQLite stores timestamps as fixed-width RFC 3339 text so that lexical
// order matches chronological order.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Serialization(e.to_string()))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| DbError::Serialization(e.to_string()))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_encoding_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(250);

        let a = encode_timestamp(&earlier);
        let b = encode_timestamp(&later);

        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), later);
    }

    #[test]
    fn test_parse_errors_are_serialization() {
        assert!(matches!(parse_timestamp("yesterday"), Err(DbError::Serialization(_))));
        assert!(matches!(parse_date("2024-13-01"), Err(DbError::Serialization(_))));
        assert!(matches!(parse_uuid("42"), Err(DbError::Serialization(_))));
    }
}
