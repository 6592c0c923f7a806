//! Pipeline error taxonomy.
//!
//! Every stage of the ingest pipeline either returns a successful result or
//! one of these variants; there is no partial success. Each variant carries
//! a fixed HTTP status code and a stable machine-readable kind string that
//! callers can branch on.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("Missing or invalid request field: {0}")]
    Validation(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Could not decode image: {0}")]
    InvalidImageFormat(String),

    #[error("Image dimensions too large: {width}x{height}")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("Memory limit exceeded while processing image: {0}")]
    MemoryLimitExceeded(String),

    #[error("Image processing timed out after {budget_secs}s")]
    ProcessingTimeout { budget_secs: u64 },

    #[error("Failed to open image: {0}")]
    Instantiation(String),

    #[error("PNG conversion failed: {0}")]
    PngConversion(String),

    #[error("WebP conversion failed: {0}")]
    WebpConversion(String),

    #[error("Could not prepare image for content scan: {0}")]
    ScanCompatibility(String),

    #[error("Image rejected by content moderation")]
    ModerationFailed {
        labels: Vec<String>,
        max_confidence: f32,
    },

    #[error("Failed to store image: {0}")]
    Upload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Static metadata for each variant: (http_status, kind, log_level).
/// The kind strings are a stable contract with callers; do not rename.
fn static_metadata(err: &PipelineError) -> (u16, &'static str, LogLevel) {
    match err {
        PipelineError::Validation(_) => (400, "VALIDATION_ERROR", LogLevel::Debug),
        PipelineError::UnsupportedFormat(_) => (400, "UNSUPPORTED_FORMAT", LogLevel::Debug),
        PipelineError::FileTooLarge { .. } => (400, "FILE_TOO_LARGE", LogLevel::Debug),
        PipelineError::InvalidImageFormat(_) => (400, "InvalidImageFormat", LogLevel::Debug),
        PipelineError::ImageTooLarge { .. } => (413, "ImageTooLarge", LogLevel::Warn),
        PipelineError::MemoryLimitExceeded(_) => (413, "MemoryLimitExceeded", LogLevel::Warn),
        PipelineError::ProcessingTimeout { .. } => (408, "ProcessingTimeout", LogLevel::Warn),
        PipelineError::Instantiation(_) => (400, "InstantiationError", LogLevel::Debug),
        PipelineError::PngConversion(_) => (500, "PNGConversionError", LogLevel::Error),
        PipelineError::WebpConversion(_) => (500, "WebPConversionError", LogLevel::Error),
        PipelineError::ScanCompatibility(_) => {
            (500, "RekognitionCompatibilityError", LogLevel::Error)
        }
        PipelineError::ModerationFailed { .. } => (400, "MODERATION_FAILED", LogLevel::Warn),
        PipelineError::Upload(_) => (500, "UploadFailure", LogLevel::Error),
        PipelineError::Internal(_) => (500, "INTERNAL_ERROR", LogLevel::Error),
    }
}

impl PipelineError {
    /// HTTP status code to return for this error.
    pub fn status_code(&self) -> u16 {
        static_metadata(self).0
    }

    /// Stable machine-readable kind (e.g. "FILE_TOO_LARGE").
    pub fn kind(&self) -> &'static str {
        static_metadata(self).1
    }

    pub fn log_level(&self) -> LogLevel {
        static_metadata(self).2
    }

    /// Whether the error is the caller's fault (4xx) rather than ours.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Client-facing message. Internal detail (provider error text, source
    /// chains) is logged, never returned to the caller for 5xx kinds.
    pub fn client_message(&self) -> String {
        match self {
            PipelineError::PngConversion(_)
            | PipelineError::WebpConversion(_)
            | PipelineError::ScanCompatibility(_) => "Image conversion failed".to_string(),
            PipelineError::Upload(_) => "Failed to store image".to_string(),
            PipelineError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
