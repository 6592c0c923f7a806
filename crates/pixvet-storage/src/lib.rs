//! Pixvet Storage Library
//!
//! Permanent object storage for published images, behind the [`Publisher`]
//! trait so the pipeline can be tested with a counting double. The
//! production backend is S3 (or any S3-compatible endpoint) via
//! `object_store`; the staging store used by moderation shares the same
//! builder.

pub mod keys;
pub mod publisher;

pub use keys::{publish_key, sanitize_filename};
pub use publisher::{build_s3_store, Publisher, S3Publisher, StorageError, StorageResult};
