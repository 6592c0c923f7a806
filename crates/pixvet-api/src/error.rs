//! HTTP error response conversion.
//!
//! Every handler returns `Result<_, ApiError>`; the conversion here renders
//! the response envelope (`success` / `message` / `error` / `data`) with the
//! status code fixed by the error kind, and logs at the severity the kind
//! calls for. Moderation rejections expose the offending labels and max
//! confidence; raw provider or library error text never leaves the server.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pixvet_core::error::{LogLevel, PipelineError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use utoipa::ToSchema;

/// Failure envelope returned for every rejected request.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    /// Machine-readable error kind for programmatic handling.
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ModerationDetails>,
}

/// Extra detail attached to moderation rejections only.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModerationDetails {
    pub moderation_labels: Vec<String>,
    pub max_confidence: f32,
}

/// Wrapper type for PipelineError to implement IntoResponse on (orphan
/// rules: both the trait and the error type live elsewhere).
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

/// Convert JSON body deserialization failures into our envelope with kind
/// VALIDATION_ERROR instead of axum's plain-text rejection.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(PipelineError::Validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that keeps rejections in the envelope format.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(ApiError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &PipelineError) {
    let kind = error.kind();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, kind, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, kind, "Request rejected");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, kind, "Request failed");
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = &self.0;

        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(error);

        let data = match error {
            PipelineError::ModerationFailed {
                labels,
                max_confidence,
            } => Some(ModerationDetails {
                moderation_labels: labels.clone(),
                max_confidence: *max_confidence,
            }),
            _ => None,
        };

        let body = Json(ErrorResponse {
            success: false,
            message: error.client_message(),
            error: error.kind().to_string(),
            data,
        });

        (status, body).into_response()
    }
}
