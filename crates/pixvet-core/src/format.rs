//! Supported image formats and content-type classification.

use crate::error::PipelineError;

/// Canonical tag for the formats this service handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    WebP,
    Jpeg,
    Png,
}

/// The format all published images are stored in.
pub const STORAGE_FORMAT: FormatTag = FormatTag::WebP;

impl FormatTag {
    /// Canonical short name, also used as the file extension.
    pub fn canonical_name(self) -> &'static str {
        match self {
            FormatTag::WebP => "webp",
            FormatTag::Jpeg => "jpg",
            FormatTag::Png => "png",
        }
    }

    pub fn extension(self) -> &'static str {
        self.canonical_name()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FormatTag::WebP => "image/webp",
            FormatTag::Jpeg => "image/jpeg",
            FormatTag::Png => "image/png",
        }
    }

    /// Whether the moderation scan accepts this encoding as staged. The
    /// whole supported set is staged as-is; anything outside it would be
    /// re-encoded to PNG first.
    pub fn is_scan_compatible(self) -> bool {
        matches!(self, FormatTag::Jpeg | FormatTag::Png | FormatTag::WebP)
    }

    pub fn is_storage_format(self) -> bool {
        self == STORAGE_FORMAT
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Classify a declared (untrusted) content type into a canonical format tag.
///
/// Accepts full MIME types (`image/png`), bare subtypes (`png`), and file
/// extensions, case-insensitively. Anything outside the supported set is
/// rejected.
pub fn classify(declared_content_type: &str) -> Result<FormatTag, PipelineError> {
    let subtype = declared_content_type
        .rsplit('/')
        .next()
        .unwrap_or(declared_content_type)
        .trim()
        .to_lowercase();

    match subtype.as_str() {
        "webp" => Ok(FormatTag::WebP),
        "jpeg" | "jpg" => Ok(FormatTag::Jpeg),
        "png" => Ok(FormatTag::Png),
        _ => Err(PipelineError::UnsupportedFormat(
            declared_content_type.to_string(),
        )),
    }
}
