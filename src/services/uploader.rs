use crate::models::{FileStatus, StatusRecord};
use crate::services::blob_store::BlobStore;
use crate::services::processing::ProcessingService;
use crate::services::status_table::StatusTable;
use crate::utils::validation::sanitize_filename;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// Failure of the synchronous part of an upload. Downstream processing
/// failures are never surfaced here; they land in the status record.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file name: {0}")]
    InvalidName(#[source] anyhow::Error),

    #[error("Blob write failed: {0}")]
    BlobWrite(#[source] anyhow::Error),

    #[error("Status record insert failed: {0}")]
    StatusInsert(#[source] anyhow::Error),
}

/// Orchestrates blob write -> status insert -> detached job dispatch.
///
/// `upload` returns as soon as the status record exists, so the caller
/// can immediately render "processing". The dispatched task applies
/// exactly one terminal update per upload; there are no retries.
pub struct UploadCoordinator {
    blobs: Arc<dyn BlobStore>,
    table: Arc<dyn StatusTable>,
    processor: Arc<dyn ProcessingService>,
}

impl UploadCoordinator {
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

    pub async fn upload(&self, file_name: &str, bytes: Bytes) -> Result<String, UploadError> {
        let file_name = sanitize_filename(file_name).map_err(UploadError::InvalidName)?;

        // Millisecond prefix keeps re-uploads of the same name distinct.
        // Two uploads of one name in the same millisecond collide; accepted.
        let file_id = format!("{}-{}", Utc::now().timestamp_millis(), file_name);

        self.blobs
            .put(&file_id, bytes.clone())
            .await
            .map_err(UploadError::BlobWrite)?;

        self.table
            .insert(StatusRecord {
                file_id: file_id.clone(),
                file_name: file_name.clone(),
                status: FileStatus::Processing,
            })
            .await
            .map_err(UploadError::StatusInsert)?;

        tracing::info!("📤 Uploaded {} ({} bytes)", file_id, bytes.len());
        self.dispatch(file_id.clone(), file_name, bytes);

        Ok(file_id)
    }

    /// Fire-and-forget hand-off to the processing service. The task owns
    /// the in-flight request and writes the single terminal status.
    fn dispatch(&self, file_id: String, file_name: String, bytes: Bytes) {
        let processor = Arc::clone(&self.processor);
        let table = Arc::clone(&self.table);

        tokio::spawn(async move {
            let status = match processor.process(&file_id, &file_name, bytes).await {
                Ok(()) => FileStatus::Completed,
                Err(e) => {
                    tracing::warn!("Processing failed for {}: {}", file_id, e);
                    FileStatus::Error
                }
            };

            match table.update_status(&file_id, status).await {
                Ok(true) => tracing::info!("Status of {} -> {}", file_id, status.as_str()),
                // Row deleted while the job was in flight; drop the outcome
                Ok(false) => {
                    tracing::debug!("Status row for {} gone before terminal update", file_id)
                }
                Err(e) => tracing::error!("Failed to record terminal status for {}: {}", file_id, e),
            }
        });
    }
}
