//! The upload pipeline state machine.
//!
//! One request moves through
//! `Received → Validated → ScanReady → Scanned(pass) → StorageReady →
//! Uploaded`, with every failure collapsing into a [`PipelineError`]. The
//! stage structs below are module-private and consumed by move, so the
//! publish step is unreachable except through a passing moderation verdict,
//! and at most one image buffer survives past the preceding stage.
//!
//! Network calls (staging, detection, cleanup, publish) happen strictly in
//! sequence; nothing runs concurrently within one request.

use std::sync::Arc;

use bytes::Bytes;

use pixvet_core::asset::{ConversionResult, ImageAsset, ModerationVerdict};
use pixvet_core::error::PipelineError;
use pixvet_core::format::FormatTag;
use pixvet_moderation::ModerationGate;
use pixvet_processing::codec::Codec;
use pixvet_processing::convert;
use pixvet_storage::{publish_key, Publisher};

/// Request-level limits enforced before any decode.
#[derive(Debug, Clone, Copy)]
pub struct PipelineLimits {
    pub max_upload_bytes: usize,
    /// Per-axis cap applied to the probed dimensions.
    pub max_dimension: u32,
}

/// Terminal success state of one pipeline run.
#[derive(Debug)]
pub struct UploadOutcome {
    pub url: String,
    pub original_format: FormatTag,
    pub final_format: FormatTag,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub converted_for_scan: bool,
    pub converted_for_storage: bool,
    pub verdict: ModerationVerdict,
}

struct Validated {
    asset: ImageAsset,
}

struct ScanReady {
    data: Bytes,
    format: FormatTag,
    converted: bool,
    original_format: FormatTag,
    original_len: usize,
    width: u32,
    height: u32,
}

/// Only [`UploadPipeline::moderate`] constructs this, which makes a passing
/// scan the sole path to the storage and publish stages.
struct ScannedClean {
    data: Bytes,
    format: FormatTag,
    converted_for_scan: bool,
    original_format: FormatTag,
    original_len: usize,
    width: u32,
    height: u32,
    verdict: ModerationVerdict,
}

struct StorageReady {
    data: Bytes,
    format: FormatTag,
    converted: bool,
    converted_for_scan: bool,
    original_format: FormatTag,
    width: u32,
    height: u32,
    verdict: ModerationVerdict,
}

pub struct UploadPipeline {
    codec: Arc<dyn Codec>,
    gate: ModerationGate,
    publisher: Arc<dyn Publisher>,
    limits: PipelineLimits,
}

impl UploadPipeline {
    pub fn new(
        codec: Arc<dyn Codec>,
        gate: ModerationGate,
        publisher: Arc<dyn Publisher>,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            codec,
            gate,
            publisher,
            limits,
        }
    }

    /// Run one upload through the full pipeline.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn run(
        &self,
        data: Bytes,
        declared_content_type: &str,
        filename: &str,
    ) -> Result<UploadOutcome, PipelineError> {
        let validated = self.validate(data, declared_content_type)?;
        let scan_ready = self.prepare_for_scan(validated).await?;
        let scanned = self.moderate(scan_ready).await?;
        let storage_ready = self.prepare_for_storage(scanned).await?;
        self.publish(storage_ready, filename).await
    }

    /// `Received → Validated`: classification and byte-length check. Cheap
    /// checks only; no decode happens here.
    fn validate(&self, data: Bytes, declared_content_type: &str) -> Result<Validated, PipelineError> {
        let asset = ImageAsset::new(data, declared_content_type)?;

        if asset.is_empty() {
            return Err(PipelineError::Validation("image payload is empty".to_string()));
        }
        if asset.len() > self.limits.max_upload_bytes {
            return Err(PipelineError::FileTooLarge {
                size: asset.len(),
                max: self.limits.max_upload_bytes,
            });
        }

        Ok(Validated { asset })
    }

    /// `Validated → ScanReady`: probe the header for dimensions (pixel
    /// budget and per-axis cap) and make the buffer scan-compatible.
    async fn prepare_for_scan(&self, stage: Validated) -> Result<ScanReady, PipelineError> {
        let mut asset = stage.asset;

        let (width, height) = self
            .codec
            .probe(asset.data())
            .await
            .map_err(convert::classify_decode_error)?;

        // The pixel budget alone admits aspect-extreme images; each axis is
        // capped separately.
        if width > self.limits.max_dimension || height > self.limits.max_dimension {
            return Err(PipelineError::ImageTooLarge { width, height });
        }
        asset.set_dimensions(width, height);

        let original_len = asset.len();
        let (data, original_format) = asset.into_parts();
        let ConversionResult {
            data,
            format,
            converted,
        } = convert::to_scan_compatible(self.codec.as_ref(), data, original_format).await?;

        Ok(ScanReady {
            data,
            format,
            converted,
            original_format,
            original_len,
            width,
            height,
        })
    }

    /// `ScanReady → Scanned(pass)` or rejection. A failing verdict stops
    /// the pipeline here; no buffer ever continues toward storage.
    async fn moderate(&self, stage: ScanReady) -> Result<ScannedClean, PipelineError> {
        let verdict = self.gate.scan(&stage.data, stage.format).await;

        if !verdict.passed {
            return Err(PipelineError::ModerationFailed {
                labels: verdict.labels,
                max_confidence: verdict.max_confidence,
            });
        }

        Ok(ScannedClean {
            data: stage.data,
            format: stage.format,
            converted_for_scan: stage.converted,
            original_format: stage.original_format,
            original_len: stage.original_len,
            width: stage.width,
            height: stage.height,
            verdict,
        })
    }

    /// `Scanned(pass) → StorageReady`: make the buffer match the storage
    /// encoding.
    async fn prepare_for_storage(&self, stage: ScannedClean) -> Result<StorageReady, PipelineError> {
        let ConversionResult {
            data,
            format,
            converted,
        } = convert::to_storage_format(
            self.codec.as_ref(),
            stage.data,
            stage.format,
            stage.original_len,
        )
        .await?;

        Ok(StorageReady {
            data,
            format,
            converted,
            converted_for_scan: stage.converted_for_scan,
            original_format: stage.original_format,
            width: stage.width,
            height: stage.height,
            verdict: stage.verdict,
        })
    }

    /// `StorageReady → Uploaded`: hand the final buffer to the publisher
    /// under a key whose extension matches the storage encoding.
    async fn publish(
        &self,
        stage: StorageReady,
        filename: &str,
    ) -> Result<UploadOutcome, PipelineError> {
        let key = publish_key(filename, stage.format);
        let size_bytes = stage.data.len();

        let url = self
            .publisher
            .publish(&key, stage.data, stage.format.mime_type())
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        tracing::info!(
            key = %key,
            url = %url,
            original_format = %stage.original_format,
            final_format = %stage.format,
            size_bytes,
            "Upload pipeline completed"
        );

        Ok(UploadOutcome {
            url,
            original_format: stage.original_format,
            final_format: stage.format,
            width: stage.width,
            height: stage.height,
            size_bytes,
            converted_for_scan: stage.converted_for_scan,
            converted_for_storage: stage.converted,
            verdict: stage.verdict,
        })
    }
}
