//! Loader module for the log shipper pipeline.
//!
//! Delivers normalized events to the search backend in bulk.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::stage::{Ports, Stage};
use logship_repository::SearchBackend;
use logship_shared::{Event, IndexTemplate, IndexableDocument};

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Retries after the first bulk attempt.
    pub max_retries: u32,
    /// Delay before the first retry (in milliseconds).
    pub initial_retry_delay_ms: u64,
    /// Upper bound on the delay between retries (in milliseconds).
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

/// Outcome of delivering one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Events received in the batch.
    pub submitted: usize,
    /// Documents the backend accepted.
    pub indexed: usize,
    /// Documents that were lost: refused, unserializable, or out of retries.
    pub failed: usize,
    /// Bulk requests made for the batch.
    pub attempts: u32,
}

/// Loader that indexes events into the search backend.
///
/// Each inbound batch becomes one bulk request against the index named by
/// the template for the current UTC date. Transient failures are retried
/// with exponential backoff; documents still failing afterwards are
/// counted as lost in the batch's [`DeliveryReport`].
pub struct SearchLoader {
    client: Arc<dyn SearchBackend>,
    template: IndexTemplate,
    config: LoaderConfig,
    ports: Ports<Vec<Event>, DeliveryReport>,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: Arc<dyn SearchBackend>, template: IndexTemplate) -> Self {
        Self::with_config(client, template, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(
        client: Arc<dyn SearchBackend>,
        template: IndexTemplate,
        config: LoaderConfig,
    ) -> Self {
        Self {
            client,
            template,
            config,
            ports: Ports::default(),
        }
    }

    /// Package `events` as documents for `index`.
    ///
    /// Events that cannot be serialized are logged and skipped.
    pub fn build_documents(events: &[Event], index: &str) -> Vec<IndexableDocument> {
        events
            .iter()
            .filter_map(|event| match IndexableDocument::from_event(event, index) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    error!(error = %e, event_type = event.event_type(), "Failed to serialize event");
                    None
                }
            })
            .collect()
    }

    /// Deliver a batch of events.
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn load(&self, events: Vec<Event>) -> DeliveryReport {
        let index = self.template.render_now();
        let documents = Self::build_documents(&events, &index);
        let unserializable = events.len() - documents.len();

        let mut report = self.submit_with_retry(documents).await;
        report.submitted = events.len();
        report.failed += unserializable;

        if report.failed > 0 {
            warn!(
                index = %index,
                indexed = report.indexed,
                failed = report.failed,
                "Batch partially delivered"
            );
        } else {
            debug!(index = %index, indexed = report.indexed, "Batch delivered");
        }

        report
    }

    /// Submit documents, resubmitting transient failures.
    async fn submit_with_retry(&self, documents: Vec<IndexableDocument>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut pending = documents;
        let mut delay = Duration::from_millis(self.config.initial_retry_delay_ms);
        let max_delay = Duration::from_millis(self.config.max_retry_delay_ms);

        for attempt in 0..=self.config.max_retries {
            if pending.is_empty() {
                break;
            }
            report.attempts += 1;

            match self.client.bulk_index(&pending).await {
                Ok(summary) => {
                    report.indexed += summary.succeeded();

                    let mut retry_positions = HashSet::new();
                    for failure in &summary.failures {
                        if failure.is_retryable() {
                            retry_positions.insert(failure.position);
                        } else {
                            error!(
                                status = failure.status,
                                reason = %failure.reason,
                                "Document refused by search backend"
                            );
                            report.failed += 1;
                        }
                    }

                    pending = pending
                        .into_iter()
                        .enumerate()
                        .filter(|(position, _)| retry_positions.contains(position))
                        .map(|(_, doc)| doc)
                        .collect();
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, attempt = attempt + 1, "Bulk request failed");
                }
                Err(e) => {
                    error!(error = %e, "Bulk request failed permanently");
                    break;
                }
            }

            if !pending.is_empty() && attempt < self.config.max_retries {
                warn!(
                    pending = pending.len(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying bulk request"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
        }

        if !pending.is_empty() {
            error!(count = pending.len(), "Dropping documents after failed delivery");
            report.failed += pending.len();
        }

        report
    }

    /// Check if the search backend is healthy.
    pub async fn health_check(&self) -> Result<bool, PipelineError> {
        Ok(self.client.health_check().await?)
    }
}

#[async_trait]
impl Stage for SearchLoader {
    type Input = Vec<Event>;
    type Output = DeliveryReport;

    fn name(&self) -> &'static str {
        "delivery"
    }

    fn ports(&mut self) -> &mut Ports<Vec<Event>, DeliveryReport> {
        &mut self.ports
    }

    async fn run(&mut self) -> Result<(), PipelineError> {
        let name = self.name();
        let mut inbound = self.ports.take_inbound(name)?;
        let outbound = self.ports.take_outbound(name);

        info!(template = %self.template.as_str(), "Starting search loader");

        while let Some(events) = inbound.recv().await {
            let report = self.load(events).await;
            outbound.send(report).await?;
        }

        info!("Search loader inbound closed");
        Ok(())
    }
}
