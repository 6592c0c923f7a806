//! Permanent storage publisher.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};

/// Storage operation errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Build an AmazonS3 object store from environment and explicit settings.
///
/// `endpoint_url` selects an S3-compatible provider (e.g.
/// "http://localhost:9000" for MinIO); plain HTTP is only allowed for such
/// explicit endpoints.
pub fn build_s3_store(
    bucket: &str,
    region: &str,
    endpoint_url: Option<&str>,
) -> StorageResult<AmazonS3> {
    let mut builder = AmazonS3Builder::from_env()
        .with_region(region.to_string())
        .with_bucket_name(bucket.to_string());

    if let Some(endpoint) = endpoint_url {
        let allow_http = endpoint.starts_with("http://");
        builder = builder
            .with_endpoint(endpoint.to_string())
            .with_allow_http(allow_http);
    }

    builder
        .build()
        .map_err(|e| StorageError::ConfigError(e.to_string()))
}

/// Generate the public URL for an object.
///
/// For AWS S3, the virtual-hosted format
/// `https://{bucket}.s3.{region}.amazonaws.com/{key}`; for S3-compatible
/// providers, path-style under the custom endpoint.
fn public_url(bucket: &str, region: &str, endpoint_url: Option<&str>, key: &str) -> String {
    if let Some(endpoint) = endpoint_url {
        let base_url = endpoint.trim_end_matches('/');
        format!("{}/{}/{}", base_url, bucket, key)
    } else {
        format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
    }
}

/// Publisher capability: one put, one public address back.
///
/// No retries at this layer; retry policy belongs to the caller's
/// surrounding infrastructure.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;
}

/// S3-backed publisher for the public bucket.
#[derive(Clone)]
pub struct S3Publisher {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3Publisher {
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let store = build_s3_store(&bucket, &region, endpoint_url.as_deref())?;
        Ok(S3Publisher {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }
}

#[async_trait]
impl Publisher for S3Publisher {
    async fn publish(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<String> {
        let size = data.len() as u64;
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 publish failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = public_url(
            &self.bucket,
            &self.region,
            self.endpoint_url.as_deref(),
            key,
        );

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 publish successful"
        );

        Ok(url)
    }
}
