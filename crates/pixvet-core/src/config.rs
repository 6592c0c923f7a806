//! Configuration module
//!
//! Environment-driven configuration for the ingest service: HTTP settings,
//! bucket/region wiring for staging and permanent storage, and the
//! processing limits and moderation thresholds the pipeline enforces.

use std::env;
use std::str::FromStr;

// Processing limits
const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_MAX_DIMENSION: u32 = 8192;
const DEFAULT_MAX_PIXELS: u64 = 64 * 1024 * 1024;
const DEFAULT_DECODE_ALLOC_BYTES: u64 = 512 * 1024 * 1024;
const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 20;

// Moderation thresholds: the provider-side recall filter and the single
// rejection gate.
const DEFAULT_DETECTION_MIN_CONFIDENCE: f32 = 50.0;
const DEFAULT_REJECTION_THRESHOLD: f32 = 70.0;

const DEFAULT_SERVER_PORT: u16 = 8080;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,

    // Storage configuration
    pub public_bucket: String,
    pub staging_bucket: String,
    pub aws_region: String,
    /// Custom endpoint for S3-compatible providers (MinIO etc.)
    pub s3_endpoint: Option<String>,

    // Processing limits
    pub max_upload_bytes: usize,
    pub max_dimension: u32,
    pub max_pixels: u64,
    pub decode_alloc_bytes: u64,
    pub conversion_timeout_secs: u64,

    // Moderation thresholds
    pub detection_min_confidence: f32,
    pub rejection_threshold: f32,
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("Invalid value for {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            server_port: env_or("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            cors_origins,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            public_bucket: env::var("PUBLIC_BUCKET").unwrap_or_default(),
            staging_bucket: env::var("STAGING_BUCKET").unwrap_or_default(),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_dimension: env_or("MAX_IMAGE_DIMENSION", DEFAULT_MAX_DIMENSION)?,
            max_pixels: env_or("MAX_IMAGE_PIXELS", DEFAULT_MAX_PIXELS)?,
            decode_alloc_bytes: env_or("DECODE_ALLOC_BYTES", DEFAULT_DECODE_ALLOC_BYTES)?,
            conversion_timeout_secs: env_or(
                "CONVERSION_TIMEOUT_SECS",
                DEFAULT_CONVERSION_TIMEOUT_SECS,
            )?,
            detection_min_confidence: env_or(
                "DETECTION_MIN_CONFIDENCE",
                DEFAULT_DETECTION_MIN_CONFIDENCE,
            )?,
            rejection_threshold: env_or("REJECTION_THRESHOLD", DEFAULT_REJECTION_THRESHOLD)?,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.public_bucket.is_empty() {
            anyhow::bail!("PUBLIC_BUCKET must be configured");
        }
        if self.staging_bucket.is_empty() {
            anyhow::bail!("STAGING_BUCKET must be configured");
        }
        if self.staging_bucket == self.public_bucket {
            anyhow::bail!("STAGING_BUCKET and PUBLIC_BUCKET must be distinct");
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be positive");
        }
        if !(0.0..=100.0).contains(&self.rejection_threshold)
            || !(0.0..=100.0).contains(&self.detection_min_confidence)
        {
            anyhow::bail!("moderation confidence thresholds must be within 0-100");
        }
        Ok(())
    }
}
