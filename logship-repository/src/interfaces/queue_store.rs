//! Queue store trait definition.
//!
//! The queue store is the buffer of record between log producers and the
//! shipper: a list per key, read with a blocking pop and a
//! non-destructive range read.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::QueueError;

/// Abstract interface for a list-like blocking-pop store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so the intake stage can own one
/// inside a spawned task.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Pop the head of the list at `key`, waiting up to `timeout` for one.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - A record was popped
    /// * `Ok(None)` - The timeout elapsed with the list empty
    /// * `Err(QueueError)` - The store could not be reached or failed the command
    async fn block_pop(&self, key: &str, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError>;

    /// Read the records between `start` and `stop` (both inclusive) without
    /// removing them.
    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>, QueueError>;
}
