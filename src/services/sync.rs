use crate::models::{FileStatus, StatusRecord};
use crate::services::blob_store::BlobStore;
use crate::services::status_table::StatusTable;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Live in-memory projection of the status table for one observing view.
///
/// Seeded with a full read on activation, then refreshed wholesale on
/// every change feed event. The table is expected to stay small; an
/// implementation targeting larger scale would merge single rows
/// instead without changing this interface.
pub struct StatusSynchronizer {
    projection: Arc<RwLock<HashMap<String, StatusRecord>>>,
    blobs: Arc<dyn BlobStore>,
    refresh_task: JoinHandle<()>,
}

impl StatusSynchronizer {
    /// Start observing the status table. Each call produces an
    /// independent projection with its own feed subscription.
    pub async fn observe(
        table: Arc<dyn StatusTable>,
        blobs: Arc<dyn BlobStore>,
    ) -> anyhow::Result<Self> {
        let projection = Arc::new(RwLock::new(HashMap::new()));

        // Subscribe before seeding so nothing slips between the two;
        // events queued during the seed just trigger one extra refresh.
        let mut feed = table.subscribe();
        Self::refresh(table.as_ref(), &projection).await?;

        let task_projection = Arc::clone(&projection);
        let refresh_task = tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(event) => {
                        tracing::debug!("Change feed: {:?} {}", event.op, event.file_id);
                        if let Err(e) = Self::refresh(table.as_ref(), &task_projection).await {
                            tracing::error!("Projection refresh failed: {}", e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Change feed lagged by {} events, refreshing", skipped);
                        if let Err(e) = Self::refresh(table.as_ref(), &task_projection).await {
                            tracing::error!("Projection refresh failed: {}", e);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Self {
            projection,
            blobs,
            refresh_task,
        })
    }

    /// Full re-read and wholesale replacement of the projection
    async fn refresh(
        table: &dyn StatusTable,
        projection: &RwLock<HashMap<String, StatusRecord>>,
    ) -> anyhow::Result<()> {
        let records = table.select_all().await?;
        let mut map = HashMap::with_capacity(records.len());
        for record in records {
            map.insert(record.file_id.clone(), record);
        }
        *projection.write().await = map;
        Ok(())
    }

    /// Current projection, keyed by file id
    pub async fn snapshot(&self) -> HashMap<String, StatusRecord> {
        self.projection.read().await.clone()
    }

    /// Blob listing merged with the projection. A blob whose status row
    /// has not landed yet (the window between blob write and record
    /// insert) reports as processing rather than being omitted.
    pub async fn list(&self) -> anyhow::Result<Vec<StatusRecord>> {
        let entries = self.blobs.list().await?;
        let projection = self.projection.read().await;

        Ok(entries
            .into_iter()
            .map(|entry| {
                projection
                    .get(&entry.key)
                    .cloned()
                    .unwrap_or_else(|| StatusRecord {
                        file_id: entry.key,
                        file_name: entry.name,
                        status: FileStatus::Processing,
                    })
            })
            .collect())
    }

    /// Release the feed subscription and stop refreshing
    pub fn dispose(self) {
        self.refresh_task.abort();
    }
}

impl Drop for StatusSynchronizer {
    fn drop(&mut self) {
        self.refresh_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::blob_store::MemoryBlobStore;
    use crate::services::status_table::MemoryStatusTable;
    use bytes::Bytes;
    use std::time::Duration;

    fn record(file_id: &str, file_name: &str, status: FileStatus) -> StatusRecord {
        StatusRecord {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            status,
        }
    }

    async fn wait_until<F>(mut condition: F)
    where
        F: AsyncFnMut() -> bool,
    {
        for _ in 0..200 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition never satisfied");
    }

    #[tokio::test]
    async fn test_seeds_existing_rows() {
        let table: Arc<dyn StatusTable> = Arc::new(MemoryStatusTable::new());
        table
            .insert(record("1-a.pdf", "a.pdf", FileStatus::Completed))
            .await
            .unwrap();

        let sync = StatusSynchronizer::observe(table.clone(), Arc::new(MemoryBlobStore::new()))
            .await
            .unwrap();

        let snapshot = sync.snapshot().await;
        assert_eq!(
            snapshot.get("1-a.pdf"),
            Some(&record("1-a.pdf", "a.pdf", FileStatus::Completed))
        );
    }

    #[tokio::test]
    async fn test_projection_tracks_table() {
        let table: Arc<dyn StatusTable> = Arc::new(MemoryStatusTable::new());
        let sync = StatusSynchronizer::observe(table.clone(), Arc::new(MemoryBlobStore::new()))
            .await
            .unwrap();

        table
            .insert(record("1-a.pdf", "a.pdf", FileStatus::Processing))
            .await
            .unwrap();
        table
            .insert(record("2-b.pdf", "b.pdf", FileStatus::Processing))
            .await
            .unwrap();
        table
            .update_status("1-a.pdf", FileStatus::Completed)
            .await
            .unwrap();
        table.delete("2-b.pdf").await.unwrap();

        // After the dust settles the projection equals a fresh select_all
        wait_until(async || {
            let snapshot = sync.snapshot().await;
            let fresh: HashMap<String, StatusRecord> = table
                .select_all()
                .await
                .unwrap()
                .into_iter()
                .map(|r| (r.file_id.clone(), r))
                .collect();
            !snapshot.is_empty() && snapshot == fresh
        })
        .await;

        assert_eq!(
            sync.snapshot().await.get("1-a.pdf").unwrap().status,
            FileStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_blob_without_row_defaults_to_processing() {
        let table: Arc<dyn StatusTable> = Arc::new(MemoryStatusTable::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let sync = StatusSynchronizer::observe(table.clone(), blobs.clone())
            .await
            .unwrap();

        // Blob written, status row not yet inserted
        blobs
            .put("9-new.pdf", Bytes::from_static(b"x"))
            .await
            .unwrap();

        let listing = sync.list().await.unwrap();
        assert_eq!(
            listing,
            vec![record("9-new.pdf", "new.pdf", FileStatus::Processing)]
        );

        // Once the row lands, the listing reflects it
        table
            .insert(record("9-new.pdf", "new.pdf", FileStatus::Error))
            .await
            .unwrap();
        wait_until(async || {
            sync.list().await.unwrap() == vec![record("9-new.pdf", "new.pdf", FileStatus::Error)]
        })
        .await;
    }

    #[tokio::test]
    async fn test_independent_observers() {
        let table: Arc<dyn StatusTable> = Arc::new(MemoryStatusTable::new());
        let blobs = Arc::new(MemoryBlobStore::new());

        let first = StatusSynchronizer::observe(table.clone(), blobs.clone())
            .await
            .unwrap();
        let second = StatusSynchronizer::observe(table.clone(), blobs.clone())
            .await
            .unwrap();

        table
            .insert(record("1-a.pdf", "a.pdf", FileStatus::Processing))
            .await
            .unwrap();

        wait_until(async || first.snapshot().await.contains_key("1-a.pdf")).await;
        wait_until(async || second.snapshot().await.contains_key("1-a.pdf")).await;

        // Disposing one observer leaves the other live
        first.dispose();
        table
            .update_status("1-a.pdf", FileStatus::Completed)
            .await
            .unwrap();
        wait_until(async || {
            second.snapshot().await.get("1-a.pdf").unwrap().status == FileStatus::Completed
        })
        .await;
    }

    #[tokio::test]
    async fn test_dispose_stops_refresh() {
        let table: Arc<dyn StatusTable> = Arc::new(MemoryStatusTable::new());
        let sync = StatusSynchronizer::observe(table.clone(), Arc::new(MemoryBlobStore::new()))
            .await
            .unwrap();

        let projection = Arc::clone(&sync.projection);
        sync.dispose();

        table
            .insert(record("1-a.pdf", "a.pdf", FileStatus::Processing))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(projection.read().await.is_empty());
    }
}
