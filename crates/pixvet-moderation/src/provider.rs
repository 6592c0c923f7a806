//! Moderation provider boundary.
//!
//! The gate talks to the outside world through [`ModerationProvider`]:
//! stage a buffer, detect labels against it, remove it. The production
//! implementation stages into an S3 bucket and detects with AWS
//! Rekognition, referencing the staged object rather than shipping bytes
//! inline.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client as RekognitionClient;
use bytes::Bytes;
use object_store::aws::AmazonS3;
use object_store::path::Path;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use pixvet_storage::build_s3_store;

/// A moderation label as returned by the provider.
#[derive(Debug, Clone)]
pub struct ModerationLabel {
    pub name: String,
    pub parent_name: Option<String>,
    /// Confidence 0-100.
    pub confidence: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("staging failed: {0}")]
    Staging(String),

    #[error("label detection failed: {0}")]
    Detection(String),

    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

/// Content-scanning capability consumed by the moderation gate.
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Put the buffer into the transient staging area under `key`.
    async fn stage(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<(), ProviderError>;

    /// Run moderation-label detection against the staged object. Labels at
    /// or above `min_confidence` are returned in provider order.
    async fn detect_labels(
        &self,
        key: &str,
        min_confidence: f32,
    ) -> Result<Vec<ModerationLabel>, ProviderError>;

    /// Remove the staged object. Best-effort; callers log failures and move
    /// on.
    async fn unstage(&self, key: &str) -> Result<(), ProviderError>;
}

/// AWS-backed provider: S3 staging bucket + Rekognition detection.
///
/// Both clients are long-lived and safe to share across concurrent
/// requests.
#[derive(Clone)]
pub struct RekognitionProvider {
    client: RekognitionClient,
    store: AmazonS3,
    bucket: String,
}

impl RekognitionProvider {
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Result<Self, ProviderError> {
        let store = build_s3_store(&bucket, &region, endpoint_url.as_deref())
            .map_err(|e| ProviderError::Staging(e.to_string()))?;

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .load()
            .await;
        let client = RekognitionClient::new(&config);

        Ok(Self {
            client,
            store,
            bucket,
        })
    }
}

#[async_trait]
impl ModerationProvider for RekognitionProvider {
    async fn stage(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ProviderError> {
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
                "Staging upload failed"
            );
            ProviderError::Staging(e.to_string())
        })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged object for moderation scan"
        );

        Ok(())
    }

    async fn detect_labels(
        &self,
        key: &str,
        min_confidence: f32,
    ) -> Result<Vec<ModerationLabel>, ProviderError> {
        let s3_object = S3Object::builder().bucket(&self.bucket).name(key).build();
        let image = Image::builder().s3_object(s3_object).build();
        let start = std::time::Instant::now();

        let response = self
            .client
            .detect_moderation_labels()
            .image(image)
            .min_confidence(min_confidence)
            .send()
            .await
            .map_err(|e| ProviderError::Detection(e.to_string()))?;

        let labels: Vec<ModerationLabel> = response
            .moderation_labels()
            .iter()
            .map(|label| ModerationLabel {
                name: label.name().unwrap_or("Unknown").to_string(),
                parent_name: label
                    .parent_name()
                    .filter(|p| !p.is_empty())
                    .map(String::from),
                confidence: label.confidence().unwrap_or(0.0),
            })
            .collect();

        tracing::debug!(
            key = %key,
            label_count = labels.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Moderation label detection completed"
        );

        Ok(labels)
    }

    async fn unstage(&self, key: &str) -> Result<(), ProviderError> {
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;
        result.map_err(|e| ProviderError::Cleanup(e.to_string()))?;

        tracing::debug!(bucket = %self.bucket, key = %key, "Deleted transient scan object");
        Ok(())
    }
}
