use crate::models::{ChangeEvent, ChangeOp, FileStatus, StatusRecord, StatusRow};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};

/// Capacity of the change feed; a lagged subscriber re-reads the whole
/// table anyway, so overflow only costs one extra refresh.
const FEED_CAPACITY: usize = 64;

/// Persisted relation holding one status row per uploaded file, plus a
/// change feed notifying subscribers of every effective mutation.
///
/// This process is the table's only writer, so emitting feed events at
/// the table seam is equivalent to a store-side subscription.
#[async_trait]
pub trait StatusTable: Send + Sync {
    async fn insert(&self, record: StatusRecord) -> Result<()>;

    /// Set the status of an existing row. Returns `false` when no row
    /// matched; updating an absent row is deliberately a no-op so a
    /// terminal update racing a delete never resurrects the record.
    async fn update_status(&self, file_id: &str, status: FileStatus) -> Result<bool>;

    /// Remove a row. Absence is not an error.
    async fn delete(&self, file_id: &str) -> Result<()>;

    async fn select_all(&self) -> Result<Vec<StatusRecord>>;

    /// Subscribe to row-level change notifications
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Sqlite-backed status table
pub struct SqliteStatusTable {
    pool: SqlitePool,
    feed: broadcast::Sender<ChangeEvent>,
}

impl SqliteStatusTable {
    pub fn new(pool: SqlitePool) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self { pool, feed }
    }
}

#[async_trait]
impl StatusTable for SqliteStatusTable {
    async fn insert(&self, record: StatusRecord) -> Result<()> {
        sqlx::query("INSERT INTO status_records (file_id, file_name, status) VALUES (?, ?, ?)")
            .bind(&record.file_id)
            .bind(&record.file_name)
            .bind(record.status.as_str())
            .execute(&self.pool)
            .await?;

        let _ = self
            .feed
            .send(ChangeEvent::new(ChangeOp::Insert, record.file_id));
        Ok(())
    }

    async fn update_status(&self, file_id: &str, status: FileStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE status_records SET status = ? WHERE file_id = ?")
            .bind(status.as_str())
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            let _ = self.feed.send(ChangeEvent::new(ChangeOp::Update, file_id));
        }
        Ok(updated)
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM status_records WHERE file_id = ?")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            let _ = self.feed.send(ChangeEvent::new(ChangeOp::Delete, file_id));
        }
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<StatusRecord>> {
        let rows: Vec<StatusRow> =
            sqlx::query_as("SELECT file_id, file_name, status FROM status_records")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(StatusRecord::try_from).collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

/// In-memory status table for development and testing
pub struct MemoryStatusTable {
    rows: RwLock<HashMap<String, StatusRecord>>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl MemoryStatusTable {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            rows: RwLock::new(HashMap::new()),
            feed,
        }
    }
}

impl Default for MemoryStatusTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusTable for MemoryStatusTable {
    async fn insert(&self, record: StatusRecord) -> Result<()> {
        let file_id = record.file_id.clone();
        self.rows.write().await.insert(file_id.clone(), record);
        let _ = self.feed.send(ChangeEvent::new(ChangeOp::Insert, file_id));
        Ok(())
    }

    async fn update_status(&self, file_id: &str, status: FileStatus) -> Result<bool> {
        let updated = match self.rows.write().await.get_mut(file_id) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        };

        if updated {
            let _ = self.feed.send(ChangeEvent::new(ChangeOp::Update, file_id));
        }
        Ok(updated)
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        if self.rows.write().await.remove(file_id).is_some() {
            let _ = self.feed.send(ChangeEvent::new(ChangeOp::Delete, file_id));
        }
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<StatusRecord>> {
        let mut records: Vec<StatusRecord> = self.rows.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.file_id.cmp(&b.file_id));
        Ok(records)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
