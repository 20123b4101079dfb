//! Error types for the log shipper repository.

mod queue_error;
mod search_error;

pub use queue_error::QueueError;
pub use search_error::SearchError;
pub(crate) use search_error::is_retryable_status;
