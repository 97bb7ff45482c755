//! Directory repository for database operations.

use super::{DbError, DbPool};
use crate::directory::{ChannelType, DirectoryEntry};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for approved-destination persistence.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Inserts entries in a single transaction.
    async fn insert_many(&self, entries: &[DirectoryEntry]) -> Result<(), DbError>;

    /// Lists all entries ordered by channel, then display name.
    async fn list(&self) -> Result<Vec<DirectoryEntry>, DbError>;

    /// Lists the entries of one channel ordered by display name.
    async fn list_by_channel(&self, channel: ChannelType) -> Result<Vec<DirectoryEntry>, DbError>;

    /// Counts all entries.
    async fn count(&self) -> Result<u64, DbError>;

}

pub(super) fn channel_from_db_str(s: &str) -> Result<ChannelType, DbError> {
    match s {
        "fax" => Ok(ChannelType::Fax),
        "email" => Ok(ChannelType::Email),
        "transfer" => Ok(ChannelType::Transfer),
        "courier" => Ok(ChannelType::Courier),
        "secure_message" => Ok(ChannelType::SecureMessage),
        _ => Err(DbError::unknown_variant("channel type", s)),
    }
}

// ============================================================================
// SQLite Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct DirectoryRow {
    id: String,
    channel: String,
    display_name: String,
    target_value: String,
    department: String,
    notes: String,
}

#[cfg(feature = "database")]
impl TryFrom<DirectoryRow> for DirectoryEntry {
    type Error = DbError;

    fn try_from(row: DirectoryRow) -> Result<Self, Self::Error> {
        Ok(DirectoryEntry {
            id: super::parse_uuid(&row.id)?,
            channel: channel_from_db_str(&row.channel)?,
            display_name: row.display_name,
            target_value: row.target_value,
            department: row.department,
            notes: row.notes,
        })
    }
}

/// SQLite implementation of DirectoryRepository.
#[cfg(feature = "database")]
pub struct SqliteDirectoryRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteDirectoryRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub(super) async fn insert(
        conn: &mut sqlx::SqliteConnection,
        entry: &DirectoryEntry,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO directory_entries (
                id, channel, display_name, target_value, department, notes
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.channel.as_db_str())
        .bind(&entry.display_name)
        .bind(&entry.target_value)
        .bind(&entry.department)
        .bind(&entry.notes)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl DirectoryRepository for SqliteDirectoryRepository {
    async fn insert_many(&self, entries: &[DirectoryEntry]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            Self::insert(&mut *tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DirectoryEntry>, DbError> {
        let rows: Vec<DirectoryRow> = sqlx::query_as(
            r#"
            SELECT id, channel, display_name, target_value, department, notes
            FROM directory_entries
            ORDER BY channel, display_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn list_by_channel(&self, channel: ChannelType) -> Result<Vec<DirectoryEntry>, DbError> {
        let rows: Vec<DirectoryRow> = sqlx::query_as(
            r#"
            SELECT id, channel, display_name, target_value, department, notes
            FROM directory_entries
            WHERE channel = ?
            ORDER BY display_name
            "#,
        )
        .bind(channel.as_db_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM directory_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgDirectoryRow {
    id: Uuid,
    channel: String,
    display_name: String,
    target_value: String,
    department: String,
    notes: String,
}

#[cfg(feature = "database")]
impl TryFrom<PgDirectoryRow> for DirectoryEntry {
    type Error = DbError;

    fn try_from(row: PgDirectoryRow) -> Result<Self, Self::Error> {
        Ok(DirectoryEntry {
            id: row.id,
            channel: channel_from_db_str(&row.channel)?,
            display_name: row.display_name,
            target_value: row.target_value,
            department: row.department,
            notes: row.notes,
        })
    }
}

/// PostgreSQL implementation of DirectoryRepository.
#[cfg(feature = "database")]
pub struct PgDirectoryRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgDirectoryRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub(super) async fn insert(
        conn: &mut sqlx::PgConnection,
        entry: &DirectoryEntry,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO directory_entries (
                id, channel, display_name, target_value, department, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.channel.as_db_str())
        .bind(&entry.display_name)
        .bind(&entry.target_value)
        .bind(&entry.department)
        .bind(&entry.notes)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl DirectoryRepository for PgDirectoryRepository {
    async fn insert_many(&self, entries: &[DirectoryEntry]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            Self::insert(&mut *tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DirectoryEntry>, DbError> {
        let rows: Vec<PgDirectoryRow> = sqlx::query_as(
            r#"
            SELECT id, channel, display_name, target_value, department, notes
            FROM directory_entries
            ORDER BY channel, display_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn list_by_channel(&self, channel: ChannelType) -> Result<Vec<DirectoryEntry>, DbError> {
        let rows: Vec<PgDirectoryRow> = sqlx::query_as(
            r#"
            SELECT id, channel, display_name, target_value, department, notes
            FROM directory_entries
            WHERE channel = $1
            ORDER BY display_name
            "#,
        )
        .bind(channel.as_db_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM directory_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

}

// ============================================================================
// Factory
// ============================================================================

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_directory_repository(pool: &DbPool) -> Box<dyn DirectoryRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteDirectoryRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgDirectoryRepository::new(pool.clone())),
    }
}
