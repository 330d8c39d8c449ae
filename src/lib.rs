pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::services::blob_store::BlobStore;
use crate::services::deleter::DeletionCoordinator;
use crate::services::processing::ProcessingService;
use crate::services::status_table::StatusTable;
use crate::services::sync::StatusSynchronizer;
use crate::services::uploader::UploadCoordinator;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::list_files,
        api::handlers::files::delete_file,
    ),
    components(
        schemas(
            api::handlers::files::UploadResponse,
            models::StatusRecord,
            models::FileStatus,
        )
    ),
    tags(
        (name = "files", description = "Document upload, status, and deletion endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub uploader: Arc<UploadCoordinator>,
    pub deleter: Arc<DeletionCoordinator>,
    pub synchronizer: Arc<StatusSynchronizer>,
    pub processor: Arc<dyn ProcessingService>,
    pub config: Config,
}

impl AppState {
    /// Wire the pipeline around the given collaborators
    pub async fn build(
        blobs: Arc<dyn BlobStore>,
        table: Arc<dyn StatusTable>,
        processor: Arc<dyn ProcessingService>,
        config: Config,
    ) -> anyhow::Result<Self> {
        let uploader = Arc::new(UploadCoordinator::new(
            blobs.clone(),
            table.clone(),
            processor.clone(),
        ));
        let deleter = Arc::new(DeletionCoordinator::new(
            blobs.clone(),
            table.clone(),
            processor.clone(),
        ));
        let synchronizer = Arc::new(StatusSynchronizer::observe(table, blobs).await?);

        Ok(Self {
            uploader,
            deleter,
            synchronizer,
            processor,
            config,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::files::health))
        .route(
            "/files",
            post(api::handlers::files::upload_file).get(api::handlers::files::list_files),
        )
        .route("/files/:file_id", delete(api::handlers::files::delete_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
