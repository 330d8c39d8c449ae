use crate::api::error::AppError;
use crate::models::{FileStatus, StatusRecord};
use crate::services::processing::ProcessingService;
use crate::utils::validation::validate_file_size;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub file_id: String,
    pub file_name: String,
    pub status: FileStatus,
}

#[utoipa::path(
    post,
    path = "/files",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File accepted for processing", body = UploadResponse),
        (status = 400, description = "Missing or invalid file"),
        (status = 502, description = "Blob store unavailable")
    )
)]
pub async fn upload_file(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .ok_or_else(|| AppError::BadRequest("File field has no filename".to_string()))?
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file field: {}", e)))?;

        validate_file_size(bytes.len(), state.config.max_file_size)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let file_id = state.uploader.upload(&file_name, bytes).await?;

        // Processing continues out of band; the caller polls /files for
        // the terminal status.
        return Ok(Json(UploadResponse {
            file_id,
            file_name,
            status: FileStatus::Processing,
        }));
    }

    Err(AppError::BadRequest(
        "Multipart body has no 'file' field".to_string(),
    ))
}

#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "Stored files with their processing status", body = [StatusRecord])
    )
)]
pub async fn list_files(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<StatusRecord>>, AppError> {
    let files = state
        .synchronizer
        .list()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(files))
}

#[utoipa::path(
    delete,
    path = "/files/{file_id}",
    params(
        ("file_id" = String, Path, description = "Blob key of the file to delete")
    ),
    responses(
        (status = 204, description = "Blob removed; status row and remote state cleaned up best-effort"),
        (status = 502, description = "Blob store unavailable")
    )
)]
pub async fn delete_file(
    State(state): State<crate::AppState>,
    Path(file_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.deleter.delete(&file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health(State(state): State<crate::AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "processing_service": state.processor.health_check().await,
    }))
}
