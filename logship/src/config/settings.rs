//! Settings read from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use logship_pipeline::consumer::{IntakeConfig, DEFAULT_QUEUE_KEY};
use logship_pipeline::loader::LoaderConfig;
use logship_pipeline::orchestrator::OrchestratorConfig;
use logship_pipeline::stage::DEFAULT_CHANNEL_CAPACITY;
use logship_repository::config::{DEFAULT_OPENSEARCH_URL, DEFAULT_REDIS_URL};
use logship_repository::{OpenSearchConfig, RedisConfig};

use crate::ShipperError;

/// Default index name template, expanded against the current UTC date.
const DEFAULT_INDEX_TEMPLATE: &str = "logstash-m1-%Y.%m.%d";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

/// Runtime settings of the log shipper.
#[derive(Debug, Clone)]
pub struct Settings {
    pub redis_url: String,
    pub queue_key: String,
    pub intake_timeout: Duration,
    pub intake_batch_size: usize,
    pub opensearch_url: String,
    pub index_template: String,
    pub legacy_mapping_types: bool,
    pub channel_capacity: usize,
    pub delivery_max_retries: u32,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REDIS_URL`: queue store URL (default: redis://127.0.0.1:6379)
    /// - `QUEUE_KEY`: list key to drain (default: logs)
    /// - `INTAKE_TIMEOUT_SECS`: blocking pop timeout (default: 1)
    /// - `INTAKE_BATCH_SIZE`: records read alongside each pop (default: 1000)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_TEMPLATE`: strftime index name template (default: logstash-m1-%Y.%m.%d)
    /// - `LEGACY_MAPPING_TYPES`: send `_type` in bulk actions (default: false)
    /// - `CHANNEL_CAPACITY`: batches buffered between stages (default: 16)
    /// - `DELIVERY_MAX_RETRIES`: bulk retries per batch (default: 3)
    /// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
    pub fn from_env() -> Result<Self, ShipperError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ShipperError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let intake_timeout_secs: f64 = parse(&lookup, "INTAKE_TIMEOUT_SECS", 1.0)?;
        if !intake_timeout_secs.is_finite() || intake_timeout_secs <= 0.0 {
            return Err(ShipperError::config(
                "INTAKE_TIMEOUT_SECS must be a positive number of seconds",
            ));
        }

        let channel_capacity = parse(&lookup, "CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY)?;
        if channel_capacity == 0 {
            return Err(ShipperError::config("CHANNEL_CAPACITY must be at least 1"));
        }

        Ok(Self {
            redis_url: string("REDIS_URL", DEFAULT_REDIS_URL),
            queue_key: string("QUEUE_KEY", DEFAULT_QUEUE_KEY),
            intake_timeout: Duration::from_secs_f64(intake_timeout_secs),
            intake_batch_size: parse(&lookup, "INTAKE_BATCH_SIZE", 1000)?,
            opensearch_url: string("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            index_template: string("INDEX_TEMPLATE", DEFAULT_INDEX_TEMPLATE),
            legacy_mapping_types: parse_flag(&lookup, "LEGACY_MAPPING_TYPES")?,
            channel_capacity,
            delivery_max_retries: parse(&lookup, "DELIVERY_MAX_RETRIES", 3)?,
            log_format: parse(&lookup, "LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    pub fn redis(&self) -> RedisConfig {
        RedisConfig::new(&self.redis_url)
    }

    pub fn opensearch(&self) -> OpenSearchConfig {
        OpenSearchConfig {
            url: self.opensearch_url.clone(),
            legacy_mapping_types: self.legacy_mapping_types,
        }
    }

    pub fn intake(&self) -> IntakeConfig {
        IntakeConfig {
            key: self.queue_key.clone(),
            block_timeout: self.intake_timeout,
            extra_batch_size: self.intake_batch_size,
            ..IntakeConfig::default()
        }
    }

    pub fn loader(&self) -> LoaderConfig {
        LoaderConfig {
            max_retries: self.delivery_max_retries,
            ..LoaderConfig::default()
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            channel_capacity: self.channel_capacity,
        }
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ShipperError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ShipperError::config(format!("Invalid {} `{}`: {}", key, value, e))),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool, ShipperError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ShipperError::config(format!("Invalid {} `{}`", key, value))),
        },
    }
}
