//! Pixvet API
//!
//! HTTP surface and pipeline wiring for the image ingest gate. The
//! interesting part lives in [`pipeline`]: the validate → scan-convert →
//! moderate → storage-convert → publish state machine. Everything else is
//! request plumbing around it.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod setup;
pub mod state;
pub mod telemetry;
