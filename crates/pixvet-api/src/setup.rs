//! Application wiring: capabilities, router, server lifecycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use pixvet_core::config::Config;
use pixvet_moderation::{ModerationGate, RekognitionProvider};
use pixvet_processing::codec::{CodecLimits, ImageCodec};
use pixvet_storage::S3Publisher;

use crate::api_doc;
use crate::handlers;
use crate::pipeline::{PipelineLimits, UploadPipeline};
use crate::state::AppState;

/// Construct the production capability set and pipeline from configuration.
pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let codec = Arc::new(ImageCodec::new(CodecLimits {
        max_pixels: config.max_pixels,
        max_side: config.max_dimension,
        max_alloc_bytes: config.decode_alloc_bytes,
        op_timeout: Duration::from_secs(config.conversion_timeout_secs),
    }));

    let provider = Arc::new(
        RekognitionProvider::new(
            config.staging_bucket.clone(),
            config.aws_region.clone(),
            config.s3_endpoint.clone(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("failed to build moderation provider: {}", e))?,
    );
    let gate = ModerationGate::new(
        provider,
        config.detection_min_confidence,
        config.rejection_threshold,
    );

    let publisher = Arc::new(
        S3Publisher::new(
            config.public_bucket.clone(),
            config.aws_region.clone(),
            config.s3_endpoint.clone(),
        )
        .map_err(|e| anyhow::anyhow!("failed to build publisher: {}", e))?,
    );

    let pipeline = UploadPipeline::new(
        codec,
        gate,
        publisher,
        PipelineLimits {
            max_upload_bytes: config.max_upload_bytes,
            max_dimension: config.max_dimension,
        },
    );

    Ok(Arc::new(AppState { config, pipeline }))
}

/// Build the router. Body limit sits above the pipeline's byte-length check
/// to absorb base64 inflation plus envelope overhead.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.max_upload_bytes * 2;

    Router::new()
        .route("/api/v0/images", post(handlers::upload::upload_image))
        .route("/api/v0/openapi.json", get(api_doc::openapi_json))
        .route("/health", get(handlers::health::health))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        max_upload_mb = config.max_upload_bytes / 1024 / 1024,
        max_dimension = config.max_dimension,
        staging_bucket = %config.staging_bucket,
        public_bucket = %config.public_bucket,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful
/// shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
