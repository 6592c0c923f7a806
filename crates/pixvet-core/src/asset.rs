//! Per-request data model.
//!
//! One [`ImageAsset`] is constructed per request and discarded at the end of
//! it; nothing here persists across requests. Buffers are `bytes::Bytes`, so
//! a pass-through "conversion" can hand back the same allocation without
//! copying, and dropping a stage's input releases the predecessor buffer.

use bytes::Bytes;
use serde::Serialize;

use crate::format::FormatTag;

/// The unit of work: one uploaded image.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    data: Bytes,
    declared_content_type: String,
    format: FormatTag,
    /// Populated on the first header probe/decode.
    dimensions: Option<(u32, u32)>,
}

impl ImageAsset {
    /// Build an asset from caller input. The declared content type is
    /// untrusted; classification is the only derivation performed here.
    pub fn new(
        data: Bytes,
        declared_content_type: impl Into<String>,
    ) -> Result<Self, crate::error::PipelineError> {
        let declared_content_type = declared_content_type.into();
        let format = crate::format::classify(&declared_content_type)?;
        Ok(Self {
            data,
            declared_content_type,
            format,
            dimensions: None,
        })
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the asset, yielding its buffer and canonical format.
    pub fn into_parts(self) -> (Bytes, FormatTag) {
        (self.data, self.format)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn declared_content_type(&self) -> &str {
        &self.declared_content_type
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.dimensions = Some((width, height));
    }
}

/// Output of a boundary format conversion.
///
/// When `converted` is false the input already matched the target format and
/// `data` is the identical buffer (shared allocation, not a copy).
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub data: Bytes,
    pub format: FormatTag,
    pub converted: bool,
}

impl ConversionResult {
    pub fn pass_through(data: Bytes, format: FormatTag) -> Self {
        Self {
            data,
            format,
            converted: false,
        }
    }

    pub fn converted(data: Bytes, format: FormatTag) -> Self {
        Self {
            data,
            format,
            converted: true,
        }
    }
}

/// Outcome of one moderation scan. Ephemeral, one per request.
///
/// Invariant: `passed` is false whenever `error` is set, and whenever any
/// disallowed label met the rejection threshold. Constructors below are the
/// only way to build one, which keeps the invariant out of callers' hands.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationVerdict {
    pub passed: bool,
    /// Detected label names, in the order the provider returned them.
    pub labels: Vec<String>,
    /// Max confidence observed across disallowed-candidate labels (0-100).
    pub max_confidence: f32,
    /// Set when the scan itself failed. Internal detail; never shown to the
    /// end caller.
    pub error: Option<String>,
}

impl ModerationVerdict {
    pub fn passed(labels: Vec<String>, max_confidence: f32) -> Self {
        Self {
            passed: true,
            labels,
            max_confidence,
            error: None,
        }
    }

    pub fn rejected(labels: Vec<String>, max_confidence: f32) -> Self {
        Self {
            passed: false,
            labels,
            max_confidence,
            error: None,
        }
    }

    /// The scan itself failed; callers must treat this exactly like a
    /// content rejection (fail closed).
    pub fn scan_failed(error: impl Into<String>) -> Self {
        Self {
            passed: false,
            labels: Vec::new(),
            max_confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_asset_classifies_on_construction() {
        let asset = ImageAsset::new(Bytes::from_static(b"abc"), "image/png").unwrap();
        assert_eq!(asset.format(), FormatTag::Png);
        assert_eq!(asset.len(), 3);
        assert_eq!(asset.declared_content_type(), "image/png");
        assert!(asset.dimensions().is_none());
    }

    #[test]
    fn test_asset_rejects_unsupported_type() {
        let result = ImageAsset::new(Bytes::from_static(b"abc"), "image/gif");
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_pass_through_shares_the_buffer() {
        let data = Bytes::from(vec![1u8, 2, 3, 4]);
        let result = ConversionResult::pass_through(data.clone(), FormatTag::Png);
        assert!(!result.converted);
        // Same allocation, not a copy.
        assert_eq!(result.data.as_ptr(), data.as_ptr());
    }

    #[test]
    fn test_verdict_error_implies_not_passed() {
        let verdict = ModerationVerdict::scan_failed("connection reset");
        assert!(!verdict.passed);
        assert!(verdict.error.is_some());
        assert!(verdict.labels.is_empty());
    }

    #[test]
    fn test_verdict_rejected_carries_labels() {
        let verdict = ModerationVerdict::rejected(vec!["Explicit Nudity".into()], 91.0);
        assert!(!verdict.passed);
        assert!(verdict.error.is_none());
        assert_eq!(verdict.labels, vec!["Explicit Nudity".to_string()]);
        assert_eq!(verdict.max_confidence, 91.0);
    }
}
