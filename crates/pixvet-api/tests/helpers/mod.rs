//! Test helpers: build the router with a real codec and counting doubles
//! for the moderation provider and publisher.
//!
//! Run from workspace root: `cargo test -p pixvet-api --test upload_test`.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use pixvet_api::pipeline::{PipelineLimits, UploadPipeline};
use pixvet_api::setup::build_router;
use pixvet_api::state::AppState;
use pixvet_core::config::Config;
use pixvet_moderation::{ModerationGate, ModerationLabel, ModerationProvider, ProviderError};
use pixvet_processing::codec::{CodecLimits, ImageCodec};
use pixvet_storage::{Publisher, StorageError};

pub struct FakeProvider {
    labels: Vec<ModerationLabel>,
    pub stage_calls: AtomicUsize,
    pub detect_calls: AtomicUsize,
    pub unstage_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn passing() -> Self {
        Self::with_labels(Vec::new())
    }

    pub fn with_labels(labels: Vec<ModerationLabel>) -> Self {
        Self {
            labels,
            stage_calls: AtomicUsize::new(0),
            detect_calls: AtomicUsize::new(0),
            unstage_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ModerationProvider for FakeProvider {
    async fn stage(
        &self,
        _key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> Result<(), ProviderError> {
        self.stage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn detect_labels(
        &self,
        _key: &str,
        _min_confidence: f32,
    ) -> Result<Vec<ModerationLabel>, ProviderError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.labels.clone())
    }

    async fn unstage(&self, _key: &str) -> Result<(), ProviderError> {
        self.unstage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePublisher {
    pub calls: AtomicUsize,
    pub last_put: Mutex<Option<(String, Bytes)>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_put: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = format!("https://cdn.example.com/{key}");
        *self.last_put.lock().unwrap() = Some((key.to_string(), data));
        Ok(url)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub provider: Arc<FakeProvider>,
    pub publisher: Arc<FakePublisher>,
}

fn test_config() -> Config {
    Config {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        public_bucket: "pixvet-public".to_string(),
        staging_bucket: "pixvet-staging".to_string(),
        aws_region: "us-east-1".to_string(),
        s3_endpoint: None,
        max_upload_bytes: 2 * 1024 * 1024,
        max_dimension: 8192,
        max_pixels: 64 * 1024 * 1024,
        decode_alloc_bytes: 512 * 1024 * 1024,
        conversion_timeout_secs: 20,
        detection_min_confidence: 50.0,
        rejection_threshold: 70.0,
    }
}

/// Build a test app with a real image codec and the given moderation
/// provider double.
pub fn setup_test_app(provider: FakeProvider) -> TestApp {
    let config = test_config();
    let provider = Arc::new(provider);
    let publisher = Arc::new(FakePublisher::new());

    let codec = Arc::new(ImageCodec::new(CodecLimits::default()));
    let gate = ModerationGate::new(
        provider.clone(),
        config.detection_min_confidence,
        config.rejection_threshold,
    );
    let pipeline = UploadPipeline::new(
        codec,
        gate,
        publisher.clone(),
        PipelineLimits {
            max_upload_bytes: config.max_upload_bytes,
            max_dimension: config.max_dimension,
        },
    );

    let state = Arc::new(AppState { config, pipeline });
    let server = TestServer::new(build_router(state)).expect("Failed to create test server");

    TestApp {
        server,
        provider,
        publisher,
    }
}

pub fn label(name: &str, confidence: f32) -> ModerationLabel {
    ModerationLabel {
        name: name.to_string(),
        parent_name: None,
        confidence,
    }
}

pub fn fixture_image(width: u32, height: u32, format: ImageFormat) -> Bytes {
    // JPEG has no alpha channel; build RGB fixtures for it.
    let img = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([40, 90, 160]),
        ))
    } else {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([40, 90, 160, 255]),
        ))
    };
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    Bytes::from(buffer)
}

pub fn encode_base64(data: &[u8]) -> String {
    BASE64.encode(data)
}
