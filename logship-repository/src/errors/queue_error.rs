//! Queue store error types.

use thiserror::Error;

/// Errors that can occur while reading from the queue store.
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    /// Failed to establish or use the connection to the queue store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store rejected or failed a command.
    #[error("Command error: {0}")]
    CommandError(String),
}

impl QueueError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::CommandError(msg.into())
    }
}
