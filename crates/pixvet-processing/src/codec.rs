//! Image codec gateway.
//!
//! Decoding and encoding go through the [`Codec`] trait so the pipeline can
//! be exercised with substitutable implementations. The production
//! [`ImageCodec`] enforces a pixel budget before any full decode, caps
//! decoder allocations, and runs all CPU-bound work on the blocking pool
//! under a time budget.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::error::{ImageError, LimitErrorKind};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use pixvet_core::format::FormatTag;

/// Structured codec failures. Variants, not message text, drive the
/// pipeline's error classification.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("image exceeds pixel budget: {width}x{height}")]
    TooManyPixels { width: u32, height: u32 },

    #[error("unrecognized or corrupt image bytes: {0}")]
    UnrecognizedFormat(String),

    #[error("memory budget exhausted: {0}")]
    OutOfMemory(String),

    #[error("operation exceeded {budget_secs}s time budget")]
    Timeout { budget_secs: u64 },

    #[error("{0}")]
    Other(String),
}

/// Limits enforced at decode time.
#[derive(Debug, Clone, Copy)]
pub struct CodecLimits {
    /// Maximum decodable pixel count, checked from the header before any
    /// full decode.
    pub max_pixels: u64,
    /// Per-axis cap handed to the decoder.
    pub max_side: u32,
    /// Decoder allocation ceiling in bytes.
    pub max_alloc_bytes: u64,
    /// Time budget for a single decode or encode.
    pub op_timeout: Duration,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_pixels: 64 * 1024 * 1024,
            max_side: 8192,
            max_alloc_bytes: 512 * 1024 * 1024,
            op_timeout: Duration::from_secs(20),
        }
    }
}

/// A decoded image held in memory. At most one of these exists per request
/// at any point; `encode` consumes it.
#[derive(Debug)]
pub struct DecodedImage {
    image: DynamicImage,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Encoder tuning. PNG encoding ignores these; WebP uses both.
#[derive(Debug, Clone, Copy)]
pub struct EncodeParams {
    /// Quality 0-100.
    pub quality: f32,
    /// Compression effort 0-6 (libwebp `method`).
    pub method: i32,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            quality: 80.0,
            method: 4,
        }
    }
}

/// Codec capability boundary.
#[async_trait]
pub trait Codec: Send + Sync {
    /// Header-only dimension read; enforces the pixel budget without
    /// decoding pixel data.
    async fn probe(&self, data: &Bytes) -> Result<(u32, u32), CodecError>;

    /// Full decode under the configured limits. Malformed input surfaces as
    /// an error, never a panic.
    async fn decode(&self, data: &Bytes) -> Result<DecodedImage, CodecError>;

    /// Re-encode to the target format, consuming the decoded image.
    async fn encode(
        &self,
        image: DecodedImage,
        target: FormatTag,
        params: EncodeParams,
    ) -> Result<Bytes, CodecError>;
}

/// Production codec over the `image` and `webp` crates.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    limits: CodecLimits,
}

impl ImageCodec {
    pub fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    /// Run a CPU-bound codec operation on the blocking pool under the time
    /// budget.
    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> Result<T, CodecError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CodecError> + Send + 'static,
    {
        let budget = self.limits.op_timeout;
        match tokio::time::timeout(budget, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(CodecError::Other(format!("{} task failed: {}", op, join_err))),
            Err(_) => Err(CodecError::Timeout {
                budget_secs: budget.as_secs(),
            }),
        }
    }

    fn image_limits(&self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.limits.max_side);
        limits.max_image_height = Some(self.limits.max_side);
        limits.max_alloc = Some(self.limits.max_alloc_bytes);
        limits
    }
}

fn read_header_dimensions(data: &[u8]) -> Result<(u32, u32), CodecError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CodecError::Other(e.to_string()))?;
    reader
        .into_dimensions()
        .map_err(|e| map_image_error(e, None))
}

fn check_pixel_budget(width: u32, height: u32, max_pixels: u64) -> Result<(), CodecError> {
    if u64::from(width) * u64::from(height) > max_pixels {
        return Err(CodecError::TooManyPixels { width, height });
    }
    Ok(())
}

/// Structural mapping from the codec library's error type. `dims` is used to
/// report the offending size when a dimension limit trips mid-decode.
fn map_image_error(err: ImageError, dims: Option<(u32, u32)>) -> CodecError {
    match err {
        ImageError::Limits(limit) => match limit.kind() {
            LimitErrorKind::InsufficientMemory => CodecError::OutOfMemory(limit.to_string()),
            LimitErrorKind::DimensionError => {
                let (width, height) = dims.unwrap_or((0, 0));
                CodecError::TooManyPixels { width, height }
            }
            _ => CodecError::OutOfMemory(limit.to_string()),
        },
        ImageError::Unsupported(e) => CodecError::UnrecognizedFormat(e.to_string()),
        ImageError::Decoding(e) => CodecError::UnrecognizedFormat(e.to_string()),
        ImageError::Encoding(e) => CodecError::Other(e.to_string()),
        ImageError::Parameter(e) => CodecError::Other(e.to_string()),
        ImageError::IoError(e) => CodecError::Other(e.to_string()),
    }
}

fn encode_blocking(
    image: DynamicImage,
    target: FormatTag,
    params: EncodeParams,
) -> Result<Bytes, CodecError> {
    match target {
        FormatTag::Png => {
            let mut buffer = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| map_image_error(e, None))?;
            Ok(Bytes::from(buffer))
        }
        FormatTag::Jpeg => {
            // JPEG has no alpha channel; flatten before encoding.
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            drop(image);

            let mut buffer = Vec::new();
            {
                let mut cursor = Cursor::new(&mut buffer);
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut cursor,
                    params.quality.clamp(1.0, 100.0) as u8,
                );
                rgb.write_with_encoder(encoder)
                    .map_err(|e| map_image_error(e, None))?;
            }
            Ok(Bytes::from(buffer))
        }
        FormatTag::WebP => {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            // Decoded representation is no longer needed once the raw
            // RGBA buffer exists.
            drop(image);

            let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);
            let mut config = webp::WebPConfig::new()
                .map_err(|_| CodecError::Other("webp encoder config init failed".to_string()))?;
            config.quality = params.quality;
            config.method = params.method;
            let encoded = encoder
                .encode_advanced(&config)
                .map_err(|e| CodecError::Other(format!("webp encode failed: {:?}", e)))?;
            Ok(Bytes::copy_from_slice(&encoded))
        }
    }
}

#[async_trait]
impl Codec for ImageCodec {
    async fn probe(&self, data: &Bytes) -> Result<(u32, u32), CodecError> {
        let data = data.clone();
        let max_pixels = self.limits.max_pixels;
        self.run_blocking("probe", move || {
            let (width, height) = read_header_dimensions(&data)?;
            check_pixel_budget(width, height, max_pixels)?;
            Ok((width, height))
        })
        .await
    }

    async fn decode(&self, data: &Bytes) -> Result<DecodedImage, CodecError> {
        let data = data.clone();
        let max_pixels = self.limits.max_pixels;
        let limits = self.image_limits();
        self.run_blocking("decode", move || {
            let (width, height) = read_header_dimensions(&data)?;
            check_pixel_budget(width, height, max_pixels)?;

            let mut reader = ImageReader::new(Cursor::new(&data))
                .with_guessed_format()
                .map_err(|e| CodecError::Other(e.to_string()))?;
            reader.limits(limits);
            let image = reader
                .decode()
                .map_err(|e| map_image_error(e, Some((width, height))))?;
            Ok(DecodedImage::new(image))
        })
        .await
    }

    async fn encode(
        &self,
        image: DecodedImage,
        target: FormatTag,
        params: EncodeParams,
    ) -> Result<Bytes, CodecError> {
        self.run_blocking("encode", move || encode_blocking(image.image, target, params))
            .await
    }
}
