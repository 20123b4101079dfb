//! Dependency initialization and wiring for the log shipper.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::ShipperError;
use logship_pipeline::{
    consumer::QueueConsumer,
    loader::SearchLoader,
    orchestrator::Orchestrator,
    processor::LogProcessor,
};
use logship_repository::{OpenSearchBackend, RedisQueueStore, SearchBackend};
use logship_shared::IndexTemplate;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Connect to the queue store and the search backend and wire the
    /// pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ShipperError)` - If a collaborator is unreachable or the
    ///   settings are invalid
    pub async fn new(settings: &Settings) -> Result<Self, ShipperError> {
        info!(
            redis_url = %settings.redis_url,
            opensearch_url = %settings.opensearch_url,
            index_template = %settings.index_template,
            "Initializing dependencies"
        );

        let template = IndexTemplate::new(settings.index_template.as_str())
            .map_err(|e| ShipperError::config(format!("Invalid INDEX_TEMPLATE: {}", e)))?;

        // Initialize OpenSearch backend
        let search_backend = OpenSearchBackend::new(settings.opensearch())?;

        // Verify OpenSearch is reachable
        let healthy = search_backend
            .health_check()
            .await
            .map_err(|e| ShipperError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(ShipperError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        // Initialize Redis queue store
        let queue_store = RedisQueueStore::connect(&settings.redis()).await?;

        info!("Redis connection established");

        let consumer = QueueConsumer::with_config(Arc::new(queue_store), settings.intake());
        let processor = LogProcessor::new();
        let loader = SearchLoader::with_config(Arc::new(search_backend), template, settings.loader());

        let orchestrator =
            Orchestrator::with_config(consumer, processor, loader, settings.orchestrator());

        Ok(Self { orchestrator })
    }
}
