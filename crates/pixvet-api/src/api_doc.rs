//! OpenAPI documentation aggregation.

use axum::Json;
use utoipa::OpenApi;

use crate::error::{ErrorResponse, ModerationDetails};
use crate::handlers::health::HealthResponse;
use crate::handlers::upload::{UploadData, UploadRequest, UploadResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::upload::upload_image,
        crate::handlers::health::health,
    ),
    components(schemas(
        UploadRequest,
        UploadResponse,
        UploadData,
        ErrorResponse,
        ModerationDetails,
        HealthResponse,
    )),
    tags(
        (name = "images", description = "Image upload, moderation, and storage"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Pixvet API",
        description = "Image ingest gate: validate, convert, moderate, store."
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
