use crate::services::blob_store::BlobStore;
use crate::services::processing::ProcessingService;
use crate::services::status_table::StatusTable;
use std::sync::Arc;
use thiserror::Error;

/// Failure to remove the primary resource (the blob). Status row and
/// remote processing state are best-effort and never fail a delete.
#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("Blob removal failed: {0}")]
    BlobDelete(#[source] anyhow::Error),
}

/// Removes a file's blob, status row, and remote processing state.
pub struct DeletionCoordinator {
    blobs: Arc<dyn BlobStore>,
    table: Arc<dyn StatusTable>,
    processor: Arc<dyn ProcessingService>,
}

impl DeletionCoordinator {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        table: Arc<dyn StatusTable>,
        processor: Arc<dyn ProcessingService>,
    ) -> Self {
        Self {
            blobs,
            table,
            processor,
        }
    }

    /// After a successful return the blob is gone. The status row and
    /// remote state may transiently linger; both are cleaned up
    /// best-effort and an in-flight processing job, if any, finds its
    /// terminal update dropped by the status table.
    pub async fn delete(&self, file_id: &str) -> Result<(), DeletionError> {
        self.blobs
            .delete(file_id)
            .await
            .map_err(DeletionError::BlobDelete)?;

        if let Err(e) = self.table.delete(file_id).await {
            tracing::warn!("Status row cleanup for {} failed: {}", file_id, e);
        }

        // Fire-and-forget; a failed release is logged, never surfaced
        let processor = Arc::clone(&self.processor);
        let file_id = file_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = processor.release(&file_id).await {
                tracing::warn!("Remote release for {} failed: {}", file_id, e);
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileStatus, StatusRecord};
    use crate::services::blob_store::{FailingBlobStore, MemoryBlobStore};
    use crate::services::processing::{FailingProcessor, NoOpProcessor};
    use crate::services::status_table::MemoryStatusTable;
    use bytes::Bytes;

    async fn seeded() -> (Arc<MemoryBlobStore>, Arc<MemoryStatusTable>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let table = Arc::new(MemoryStatusTable::new());
        blobs
            .put("1-a.pdf", Bytes::from_static(b"x"))
            .await
            .unwrap();
        table
            .insert(StatusRecord {
                file_id: "1-a.pdf".to_string(),
                file_name: "a.pdf".to_string(),
                status: FileStatus::Completed,
            })
            .await
            .unwrap();
        (blobs, table)
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_row() {
        let (blobs, table) = seeded().await;
        let deleter =
            DeletionCoordinator::new(blobs.clone(), table.clone(), Arc::new(NoOpProcessor));

        deleter.delete("1-a.pdf").await.unwrap();

        assert!(blobs.list().await.unwrap().is_empty());
        assert!(table.select_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (blobs, table) = seeded().await;
        let deleter =
            DeletionCoordinator::new(blobs.clone(), table.clone(), Arc::new(NoOpProcessor));

        deleter.delete("1-a.pdf").await.unwrap();
        // Second call: absent blob and absent row are both fine
        deleter.delete("1-a.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_release_still_succeeds() {
        let (blobs, table) = seeded().await;
        let deleter =
            DeletionCoordinator::new(blobs.clone(), table.clone(), Arc::new(FailingProcessor));

        // The remote notification failing must not surface to the caller
        deleter.delete("1-a.pdf").await.unwrap();
        assert!(blobs.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blob_failure_leaves_row_untouched() {
        let table = Arc::new(MemoryStatusTable::new());
        table
            .insert(StatusRecord {
                file_id: "1-a.pdf".to_string(),
                file_name: "a.pdf".to_string(),
                status: FileStatus::Completed,
            })
            .await
            .unwrap();
        let deleter =
            DeletionCoordinator::new(Arc::new(FailingBlobStore), table.clone(), Arc::new(NoOpProcessor));

        let result = deleter.delete("1-a.pdf").await;
        assert!(matches!(result, Err(DeletionError::BlobDelete(_))));
        // No partial cleanup happened
        assert_eq!(table.select_all().await.unwrap().len(), 1);
    }
}
