//! In-memory queue store and search backend shared by the pipeline tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use logship_pipeline::consumer::{IntakeConfig, QueueConsumer};
use logship_pipeline::loader::{LoaderConfig, SearchLoader};
use logship_pipeline::orchestrator::Orchestrator;
use logship_pipeline::processor::LogProcessor;
use logship_repository::{BulkSummary, QueueError, QueueStore, SearchBackend, SearchError};
use logship_shared::{IndexTemplate, IndexableDocument};

/// A list that pops from the head and range-reads without removing.
#[derive(Default)]
pub struct MemoryQueueStore {
    records: Mutex<VecDeque<Vec<u8>>>,
    pub pop_count: AtomicUsize,
}

impl MemoryQueueStore {
    pub fn with_records(records: Vec<Vec<u8>>) -> Self {
        Self {
            records: Mutex::new(records.into()),
            pop_count: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn block_pop(&self, _key: &str, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        self.pop_count.fetch_add(1, Ordering::SeqCst);
        let popped = self.records.lock().unwrap().pop_front();
        if popped.is_none() {
            tokio::time::sleep(timeout).await;
        }
        Ok(popped)
    }

    async fn range(&self, _key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>, QueueError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }
}

/// A search backend that forwards every bulk request to the test.
pub struct RecordingBackend {
    requests: mpsc::UnboundedSender<Vec<IndexableDocument>>,
    panic_on_bulk: bool,
}

impl RecordingBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<IndexableDocument>>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (
            Self {
                requests,
                panic_on_bulk: false,
            },
            rx,
        )
    }

    pub fn panicking() -> Self {
        let (backend, _) = Self::new();
        Self {
            panic_on_bulk: true,
            ..backend
        }
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    async fn bulk_index(&self, documents: &[IndexableDocument]) -> Result<BulkSummary, SearchError> {
        if self.panic_on_bulk {
            panic!("backend exploded");
        }
        let _ = self.requests.send(documents.to_vec());
        Ok(BulkSummary::success(documents.len()))
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}

/// Build a pipeline with a short intake timeout.
pub fn pipeline(
    store: Arc<dyn QueueStore>,
    backend: Arc<dyn SearchBackend>,
    extra_batch_size: usize,
) -> Orchestrator {
    let consumer = QueueConsumer::with_config(
        store,
        IntakeConfig {
            block_timeout: Duration::from_millis(20),
            extra_batch_size,
            error_backoff: Duration::from_millis(20),
            ..IntakeConfig::default()
        },
    );
    let template = IndexTemplate::new("logstash-m1-%Y.%m.%d").unwrap();
    let loader = SearchLoader::with_config(backend, template, LoaderConfig::default());

    Orchestrator::new(consumer, LogProcessor::new(), loader)
}

/// Encode a record the way log producers do.
pub fn record(fields: &[(&str, &str)]) -> Vec<u8> {
    let map: BTreeMap<&str, &str> = fields.iter().copied().collect();
    rmp_serde::to_vec(&map).unwrap()
}
