//! Pixvet Moderation Library
//!
//! The content moderation gate: stages a buffer in the transient scan
//! bucket, runs AWS Rekognition moderation-label detection against it,
//! interprets the labels into a pass/fail verdict, and guarantees the
//! transient object is cleaned up whatever the outcome. Any provider
//! failure fails closed.

pub mod gate;
pub mod labels;
pub mod provider;

pub use gate::ModerationGate;
pub use labels::is_disallowed;
pub use provider::{ModerationLabel, ModerationProvider, ProviderError, RekognitionProvider};
