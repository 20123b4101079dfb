//! Search backend trait definition.
//!
//! This module defines the abstract interface for bulk indexing, allowing
//! for different backend implementations (OpenSearch, Elasticsearch, mocks).

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::BulkSummary;
use logship_shared::IndexableDocument;

/// Abstract interface for search backend operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// A request that fails as a whole returns `Err(SearchError)`. A request
/// the backend accepted but in which some documents were refused returns
/// `Ok` with the refusals listed in the [`BulkSummary`].
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Index multiple documents in a single bulk operation.
    ///
    /// Each document carries its own target index and kind.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - The request was processed; per-item failures are listed
    /// * `Err(SearchError)` - The request itself failed
    async fn bulk_index(&self, documents: &[IndexableDocument]) -> Result<BulkSummary, SearchError>;

    /// Check if the search backend is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the backend is healthy
    /// * `Ok(false)` - If the backend is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
