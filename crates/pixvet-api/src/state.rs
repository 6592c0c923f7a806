//! Shared application state.

use pixvet_core::config::Config;

use crate::pipeline::UploadPipeline;

/// State shared by all handlers. The pipeline owns the long-lived provider
/// clients; they are safe to use across concurrent requests.
pub struct AppState {
    pub config: Config,
    pub pipeline: UploadPipeline,
}
