//! Mock implementation of DirectoryRepository for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::{DbError, DirectoryRepository};
use crate::directory::{ChannelType, DirectoryEntry};

/// Mock implementation of DirectoryRepository using in-memory storage.
pub struct MockDirectoryRepository {
    entries: Arc<RwLock<Vec<DirectoryEntry>>>,
}

impl Default for MockDirectoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDirectoryRepository {
    /// Creates an empty mock repository.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a mock repository pre-populated with entries.
    pub fn with_entries(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Removes everything, returning how many items were held.
    pub async fn clear(&self) -> u64 {
        let mut entries = self.entries.write().await;
        let removed = entries.len() as u64;
        entries.clear();
        removed
    }
}

fn sorted(mut entries: Vec<DirectoryEntry>) -> Vec<DirectoryEntry> {
    entries.sort_by(|a, b| {
        a.channel
            .as_db_str()
            .cmp(b.channel.as_db_str())
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    entries
}

#[async_trait]
impl DirectoryRepository for MockDirectoryRepository {
    async fn insert_many(&self, entries: &[DirectoryEntry]) -> Result<(), DbError> {
        let mut stored = self.entries.write().await;
        if let Some(dup) = entries.iter().find(|e| stored.iter().any(|s| s.id == e.id)) {
            return Err(DbError::Constraint(format!(
                "directory entry {} already exists",
                dup.id
            )));
        }
        stored.extend_from_slice(entries);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DirectoryEntry>, DbError> {
        Ok(sorted(self.entries.read().await.clone()))
    }

    async fn list_by_channel(&self, channel: ChannelType) -> Result<Vec<DirectoryEntry>, DbError> {
        let entries = self.entries.read().await;
        Ok(sorted(
            entries
                .iter()
                .filter(|e| e.channel == channel)
                .cloned()
                .collect(),
        ))
    }

    async fn count(&self) -> Result<u64, DbError> {
        Ok(self.entries.read().await.len() as u64)
    }

}
