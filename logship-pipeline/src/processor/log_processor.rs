//! Log record processor.
//!
//! Decodes MessagePack records and normalizes them by their `type` field.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::consumer::RawBatch;
use crate::errors::PipelineError;
use crate::processor::time_cache::TimeParseCache;
use crate::processor::{access_log, error_log};
use crate::stage::{Ports, Stage};
use logship_shared::{Event, EventKind, RawEvent};

/// Reasons a raw record cannot become an event.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not a MessagePack map.
    #[error("Malformed record: {0}")]
    Malformed(#[from] rmp_serde::decode::Error),

    /// The record has no string `type` field.
    #[error("Record has no string `type` field")]
    MissingType,
}

/// Processor that turns raw queue records into normalized events.
///
/// Owns one timestamp cache per log format.
pub struct LogProcessor {
    access_times: TimeParseCache,
    error_times: TimeParseCache,
    ports: Ports<RawBatch, Vec<Event>>,
}

impl LogProcessor {
    pub fn new() -> Self {
        Self::with_caches(TimeParseCache::access_log(), TimeParseCache::error_log())
    }

    pub fn with_caches(access_times: TimeParseCache, error_times: TimeParseCache) -> Self {
        Self {
            access_times,
            error_times,
            ports: Ports::default(),
        }
    }

    /// Decode a single MessagePack record.
    pub fn decode(record: &[u8]) -> Result<RawEvent, DecodeError> {
        let raw: RawEvent = rmp_serde::from_slice(record)?;
        if raw.event_type().is_none() {
            return Err(DecodeError::MissingType);
        }
        Ok(raw)
    }

    /// Process a batch of raw records.
    ///
    /// Records that fail to decode are logged and dropped, so the result
    /// may be shorter than the input.
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    pub fn process_batch(&mut self, records: RawBatch) -> Vec<Event> {
        let mut events = Vec::with_capacity(records.len());

        for record in records {
            match Self::decode(&record) {
                Ok(raw) => events.push(self.normalize(raw)),
                Err(e) => {
                    warn!(
                        error = %e,
                        payload = %record.escape_ascii(),
                        "Dropping undecodable record"
                    );
                }
            }
        }

        debug!(event_count = events.len(), "Processed record batch");
        events
    }

    /// Normalize a decoded record according to its type.
    pub fn normalize(&mut self, raw: RawEvent) -> Event {
        let kind = raw
            .event_type()
            .map(EventKind::classify)
            .unwrap_or(EventKind::Other);

        match kind {
            EventKind::AccessLog => Event::Access(access_log::normalize(raw, &mut self.access_times)),
            EventKind::ErrorLog => Event::Error(error_log::normalize(raw, &mut self.error_times)),
            EventKind::Other => Event::Other(raw),
        }
    }
}

impl Default for LogProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for LogProcessor {
    type Input = RawBatch;
    type Output = Vec<Event>;

    fn name(&self) -> &'static str {
        "normalization"
    }

    fn ports(&mut self) -> &mut Ports<RawBatch, Vec<Event>> {
        &mut self.ports
    }

    async fn run(&mut self) -> Result<(), PipelineError> {
        let name = self.name();
        let mut inbound = self.ports.take_inbound(name)?;
        let outbound = self.ports.take_outbound(name);

        info!("Starting log processor");

        while let Some(records) = inbound.recv().await {
            let events = self.process_batch(records);
            if events.is_empty() {
                continue;
            }
            outbound.send(events).await?;
        }

        info!("Log processor inbound closed");
        Ok(())
    }
}
