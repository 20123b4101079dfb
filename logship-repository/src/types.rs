//! Result types for bulk indexing.

use crate::errors::is_retryable_status;

/// A single document the backend refused in a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// Position of the document in the submitted slice.
    pub position: usize,
    /// HTTP status reported for the item.
    pub status: u16,
    /// Error reason reported by the backend.
    pub reason: String,
}

impl BulkItemFailure {
    /// Whether resubmitting the document may succeed.
    pub fn is_retryable(&self) -> bool {
        is_retryable_status(self.status)
    }
}

/// Summary of a bulk indexing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Number of documents submitted.
    pub total: usize,
    /// Items the backend refused.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkSummary {
    /// A summary in which every document was accepted.
    pub fn success(total: usize) -> Self {
        Self {
            total,
            failures: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.total.saturating_sub(self.failures.len())
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
