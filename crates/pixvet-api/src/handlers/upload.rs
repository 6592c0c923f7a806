//! Upload image handler.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use pixvet_core::error::PipelineError;

use crate::error::{ApiError, ErrorResponse, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Base64-encoded image bytes.
    #[validate(length(min = 1, message = "imageData is required"))]
    pub image_data: String,
    #[validate(length(min = 1, message = "filename is required"))]
    pub filename: String,
    /// Declared MIME type. Derived from the filename extension when absent.
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub data: UploadData,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    /// Public address of the stored image.
    pub url: String,
    pub original_format: String,
    pub final_format: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub converted_for_scan: bool,
    pub converted_for_storage: bool,
}

fn declared_content_type(content_type: Option<String>, filename: &str) -> String {
    match content_type {
        Some(ct) if !ct.trim().is_empty() => ct,
        _ => Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string(),
    }
}

/// Upload image handler
///
/// Decodes the request payload and hands it to the upload pipeline:
/// validation, scan-compatible conversion, content moderation, storage
/// conversion, publish. Responds with the published address on success.
#[utoipa::path(
    post,
    path = "/api/v0/images",
    tag = "images",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Image moderated and stored", body = UploadResponse),
        (status = 400, description = "Invalid input, unsupported format, or moderation rejection", body = ErrorResponse),
        (status = 408, description = "Conversion timed out", body = ErrorResponse),
        (status = 413, description = "Image exceeds processing limits", body = ErrorResponse),
        (status = 500, description = "Conversion or storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(filename = %request.filename, operation = "upload_image")
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| PipelineError::Validation(e.to_string()))?;

    let UploadRequest {
        image_data,
        filename,
        content_type,
    } = request;

    let bytes = BASE64
        .decode(image_data.as_bytes())
        .map_err(|_| PipelineError::Validation("imageData is not valid base64".to_string()))?;
    drop(image_data);

    let declared = declared_content_type(content_type, &filename);

    let outcome = state
        .pipeline
        .run(Bytes::from(bytes), &declared, &filename)
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        message: "Image uploaded".to_string(),
        data: UploadData {
            url: outcome.url,
            original_format: outcome.original_format.canonical_name().to_string(),
            final_format: outcome.final_format.canonical_name().to_string(),
            width: outcome.width,
            height: outcome.height,
            size_bytes: outcome.size_bytes,
            converted_for_scan: outcome.converted_for_scan,
            converted_for_storage: outcome.converted_for_storage,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_prefers_explicit_content_type() {
        assert_eq!(
            declared_content_type(Some("image/png".into()), "photo.jpg"),
            "image/png"
        );
    }

    #[test]
    fn test_declared_type_falls_back_to_extension() {
        assert_eq!(declared_content_type(None, "photo.jpg"), "jpg");
        assert_eq!(declared_content_type(Some("  ".into()), "photo.webp"), "webp");
        assert_eq!(declared_content_type(None, "noextension"), "");
    }

    #[test]
    fn test_request_validation_rejects_empty_fields() {
        let request = UploadRequest {
            image_data: String::new(),
            filename: "a.png".to_string(),
            content_type: None,
        };
        assert!(request.validate().is_err());

        let request = UploadRequest {
            image_data: "aGVsbG8=".to_string(),
            filename: String::new(),
            content_type: None,
        };
        assert!(request.validate().is_err());
    }
}
