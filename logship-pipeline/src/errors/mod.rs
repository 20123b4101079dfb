//! Error types for the log shipper pipeline.

use logship_repository::SearchError;
use thiserror::Error;

/// Errors that can occur in the log shipper pipeline.
///
/// Faults confined to one round, record or document are logged and
/// absorbed by the stage that meets them; these errors end a stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the search backend.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// A stage was started before its inbound channel was wired.
    #[error("Stage `{0}` was started without an inbound channel")]
    Unwired(&'static str),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A stage task panicked or was aborted.
    #[error("Stage `{stage}` task failed: {reason}")]
    StageTaskFailed { stage: &'static str, reason: String },
}

impl PipelineError {
    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }
}
