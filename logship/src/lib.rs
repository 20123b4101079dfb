//! # Logship
//!
//! Entry point and configuration for running the log shipper pipeline.

pub mod config;
pub mod telemetry;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur during shipper initialization or execution.
#[derive(Error, Debug)]
pub enum ShipperError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] logship_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] logship_repository::SearchError),

    /// Queue store error.
    #[error("Queue error: {0}")]
    QueueError(#[from] logship_repository::QueueError),
}

impl ShipperError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
