//! Boundary conversions and codec error classification.
//!
//! Two conversions bracket the moderation scan: one guarantees the buffer
//! is acceptable to the scan provider, the other guarantees the storage
//! encoding. Both take their input buffer by value so the predecessor
//! buffer is released as soon as a conversion replaces it.

use bytes::Bytes;

use pixvet_core::asset::ConversionResult;
use pixvet_core::error::PipelineError;
use pixvet_core::format::{FormatTag, STORAGE_FORMAT};

use crate::codec::{Codec, CodecError, EncodeParams};

/// Inputs over 1 MiB get a slightly lower quality and higher effort.
const LARGE_INPUT_BYTES: usize = 1024 * 1024;

/// Standard WebP compression profile for the storage encoding.
pub fn webp_encode_params(original_len: usize) -> EncodeParams {
    if original_len > LARGE_INPUT_BYTES {
        EncodeParams {
            quality: 75.0,
            method: 5,
        }
    } else {
        EncodeParams {
            quality: 80.0,
            method: 4,
        }
    }
}

/// Map a decode-time codec failure onto the pipeline taxonomy.
pub fn classify_decode_error(err: CodecError) -> PipelineError {
    match err {
        CodecError::OutOfMemory(msg) => PipelineError::MemoryLimitExceeded(msg),
        CodecError::TooManyPixels { width, height } => {
            PipelineError::ImageTooLarge { width, height }
        }
        CodecError::UnrecognizedFormat(msg) => PipelineError::InvalidImageFormat(msg),
        CodecError::Timeout { budget_secs } => PipelineError::ProcessingTimeout { budget_secs },
        CodecError::Other(msg) => PipelineError::Instantiation(msg),
    }
}

/// Map an encode-time codec failure onto the pipeline taxonomy. Resource
/// failures keep their own kinds; everything else becomes the conversion
/// error for the target format.
pub fn classify_encode_error(err: CodecError, target: FormatTag) -> PipelineError {
    match err {
        CodecError::OutOfMemory(msg) => PipelineError::MemoryLimitExceeded(msg),
        CodecError::TooManyPixels { width, height } => {
            PipelineError::ImageTooLarge { width, height }
        }
        CodecError::Timeout { budget_secs } => PipelineError::ProcessingTimeout { budget_secs },
        // A pixel buffer the PNG encoder cannot take means the image could
        // not be prepared for the scan at all.
        CodecError::UnrecognizedFormat(msg) if target == FormatTag::Png => {
            PipelineError::ScanCompatibility(msg)
        }
        CodecError::UnrecognizedFormat(msg) | CodecError::Other(msg) => match target {
            FormatTag::Png => PipelineError::PngConversion(msg),
            FormatTag::WebP => PipelineError::WebpConversion(msg),
            FormatTag::Jpeg => PipelineError::Internal(format!("jpeg conversion failed: {}", msg)),
        },
    }
}

/// Ensure the buffer is in an encoding the moderation scan accepts.
///
/// The whole supported format set is staged as-is (`converted=false`, same
/// buffer); anything outside it is decoded and re-encoded to PNG. The input
/// buffer is dropped as soon as a replacement exists.
pub async fn to_scan_compatible(
    codec: &dyn Codec,
    data: Bytes,
    format: FormatTag,
) -> Result<ConversionResult, PipelineError> {
    if format.is_scan_compatible() {
        return Ok(ConversionResult::pass_through(data, format));
    }

    let decoded = codec.decode(&data).await.map_err(classify_decode_error)?;
    drop(data);
    let png = codec
        .encode(decoded, FormatTag::Png, EncodeParams::default())
        .await
        .map_err(|e| classify_encode_error(e, FormatTag::Png))?;
    Ok(ConversionResult::converted(png, FormatTag::Png))
}

/// Ensure the buffer is in the storage encoding (WebP).
///
/// `original_len` is the byte length of the originally uploaded buffer and
/// selects the compression profile.
pub async fn to_storage_format(
    codec: &dyn Codec,
    data: Bytes,
    format: FormatTag,
    original_len: usize,
) -> Result<ConversionResult, PipelineError> {
    if format.is_storage_format() {
        return Ok(ConversionResult::pass_through(data, format));
    }

    let decoded = codec.decode(&data).await.map_err(classify_decode_error)?;
    drop(data);
    let params = webp_encode_params(original_len);
    let encoded = codec
        .encode(decoded, STORAGE_FORMAT, params)
        .await
        .map_err(|e| classify_encode_error(e, STORAGE_FORMAT))?;
    Ok(ConversionResult::converted(encoded, STORAGE_FORMAT))
}
