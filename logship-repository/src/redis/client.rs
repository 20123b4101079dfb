//! Redis queue store implementation.
//!
//! Producers `RPUSH` encoded records onto a list; the shipper reads them
//! with `BLPOP` and `LRANGE`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::config::RedisConfig;
use crate::errors::QueueError;
use crate::interfaces::QueueStore;

/// Smallest blocking timeout sent to Redis; a zero timeout would block forever.
const MIN_BLOCK_SECS: f64 = 0.01;

/// Queue store backed by a Redis list.
///
/// The connection manager reconnects transparently, so a failed command
/// surfaces as a `QueueError` for that round only.
pub struct RedisQueueStore {
    connection: ConnectionManager,
}

impl RedisQueueStore {
    /// Connect to Redis.
    ///
    /// # Returns
    ///
    /// * `Ok(RedisQueueStore)` - A connected store
    /// * `Err(QueueError)` - If the URL is invalid or the connection cannot be made in time
    pub async fn connect(config: &RedisConfig) -> Result<Self, QueueError> {
        let client =
            redis::Client::open(config.url.as_str()).map_err(|e| QueueError::connection(e.to_string()))?;

        let connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                QueueError::connection(format!(
                    "Timed out after {:?} connecting to Redis",
                    config.connection_timeout
                ))
            })?
            .map_err(|e| QueueError::connection(e.to_string()))?;

        info!(url = %config.url, "Connected to Redis");

        Ok(Self { connection })
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn block_pop(&self, key: &str, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        let mut connection = self.connection.clone();
        let secs = timeout.as_secs_f64().max(MIN_BLOCK_SECS);

        let popped: Option<(String, Vec<u8>)> = connection
            .blpop(key, secs)
            .await
            .map_err(|e| QueueError::command(e.to_string()))?;

        Ok(popped.map(|(_, record)| record))
    }

    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>, QueueError> {
        let mut connection = self.connection.clone();

        let records: Vec<Vec<u8>> = connection
            .lrange(key, start, stop)
            .await
            .map_err(|e| QueueError::command(e.to_string()))?;

        debug!(key = %key, count = records.len(), "Read queued records");
        Ok(records)
    }
}
