use crate::services::deleter::DeletionError;
use crate::services::uploader::UploadError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Deletion failed: {0}")]
    Deletion(#[from] DeletionError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Upload(UploadError::InvalidName(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Upload(e) => {
                tracing::error!("Upload error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Failed to upload file".to_string())
            }
            AppError::Deletion(e) => {
                tracing::error!("Deletion error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Failed to delete file".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
