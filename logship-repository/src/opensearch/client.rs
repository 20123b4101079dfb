//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchBackend`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    BulkParts, OpenSearch,
};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::OpenSearchConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchBackend;
use crate::types::{BulkItemFailure, BulkSummary};
use logship_shared::IndexableDocument;

/// OpenSearch backend implementation.
///
/// Every document is sent as an `index` action against the index named in
/// the document, so one bulk request can span several daily indices.
///
/// # Example
///
/// ```ignore
/// use logship_repository::{OpenSearchBackend, OpenSearchConfig, SearchBackend};
///
/// let backend = OpenSearchBackend::new(OpenSearchConfig::new("http://localhost:9200"))?;
/// let summary = backend.bulk_index(&documents).await?;
/// println!("{} of {} documents indexed", summary.succeeded(), summary.total);
/// ```
pub struct OpenSearchBackend {
    client: OpenSearch,
    config: OpenSearchConfig,
}

impl OpenSearchBackend {
    /// Create a new OpenSearch backend for the configured URL.
    ///
    /// No request is made; use [`SearchBackend::health_check`] to verify
    /// the cluster is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBackend)` - A new backend instance
    /// * `Err(SearchError)` - If the URL is invalid or transport setup fails
    pub fn new(config: OpenSearchConfig) -> Result<Self, SearchError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %config.url,
            legacy_mapping_types = config.legacy_mapping_types,
            "Created OpenSearch backend"
        );

        Ok(Self { client, config })
    }

    /// Build the newline-delimited bulk body: one action line followed by
    /// one source line per document.
    fn bulk_lines(documents: &[IndexableDocument], legacy_mapping_types: bool) -> Vec<Value> {
        let mut lines = Vec::with_capacity(documents.len() * 2);

        for doc in documents {
            let mut action = Map::new();
            action.insert("_index".to_string(), json!(doc.index));
            if legacy_mapping_types {
                action.insert("_type".to_string(), json!(doc.kind));
            }
            lines.push(json!({ "index": action }));
            lines.push(doc.body.clone());
        }

        lines
    }

    /// Extract refused items from a bulk response body.
    fn parse_bulk_response(body: &Value) -> Result<Vec<BulkItemFailure>, SearchError> {
        let has_errors = body
            .get("errors")
            .and_then(Value::as_bool)
            .ok_or_else(|| SearchError::parse("Bulk response has no `errors` flag"))?;

        if !has_errors {
            return Ok(Vec::new());
        }

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::parse("Bulk response has no `items` array"))?;

        let failures = items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| {
                // Each item is keyed by its action name, e.g. {"index": {...}}
                let result = item.as_object()?.values().next()?;
                let error = result.get("error")?;
                let status = result
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(500);
                let reason = error
                    .get("reason")
                    .and_then(Value::as_str)
                    .or_else(|| error.get("type").and_then(Value::as_str))
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());

                Some(BulkItemFailure {
                    position,
                    status,
                    reason,
                })
            })
            .collect();

        Ok(failures)
    }
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    #[instrument(skip(self, documents), fields(document_count = documents.len()))]
    async fn bulk_index(&self, documents: &[IndexableDocument]) -> Result<BulkSummary, SearchError> {
        if documents.is_empty() {
            return Ok(BulkSummary::success(0));
        }

        let body: Vec<JsonBody<Value>> =
            Self::bulk_lines(documents, self.config.legacy_mapping_types)
                .into_iter()
                .map(JsonBody::from)
                .collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::request_failed(status.as_u16(), error_body));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let failures = Self::parse_bulk_response(&response_body)?;
        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                total = documents.len(),
                "Bulk request had refused documents"
            );
        }

        debug!(total = documents.len(), "Bulk request completed");
        Ok(BulkSummary {
            total: documents.len(),
            failures,
        })
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let health: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let status = health
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        info!(status = %status, "OpenSearch cluster status");
        Ok(status == "green" || status == "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(index: &str, kind: &str) -> IndexableDocument {
        IndexableDocument {
            index: index.to_string(),
            kind: kind.to_string(),
            body: json!({"type": kind, "status": 200}),
        }
    }

    #[test]
    fn test_bulk_lines() {
        let docs = vec![
            document("logstash-m1-2023.10.10", "access-log"),
            document("logstash-m1-2023.10.10", "error-log"),
        ];

        let lines = OpenSearchBackend::bulk_lines(&docs, false);

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            json!({"index": {"_index": "logstash-m1-2023.10.10"}})
        );
        assert_eq!(lines[1], json!({"type": "access-log", "status": 200}));
        assert_eq!(lines[3]["type"], json!("error-log"));
    }

    #[test]
    fn test_bulk_lines_with_mapping_types() {
        let docs = vec![document("logs", "access-log")];

        let lines = OpenSearchBackend::bulk_lines(&docs, true);

        assert_eq!(
            lines[0],
            json!({"index": {"_index": "logs", "_type": "access-log"}})
        );
    }

    #[test]
    fn test_parse_bulk_response_success() {
        let body = json!({
            "took": 3,
            "errors": false,
            "items": [{"index": {"status": 201}}]
        });

        let failures = OpenSearchBackend::parse_bulk_response(&body).unwrap();
        assert!(failures.is_empty());
    }

    #[test]
    fn test_parse_bulk_response_partial_failure() {
        let body = json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"index": {"status": 429, "error": {"type": "es_rejected_execution_exception", "reason": "queue full"}}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        });

        let failures = OpenSearchBackend::parse_bulk_response(&body).unwrap();

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].position, 1);
        assert_eq!(failures[0].status, 429);
        assert_eq!(failures[0].reason, "queue full");
        assert_eq!(failures[1].position, 2);
        assert_eq!(failures[1].reason, "mapper_parsing_exception");
    }

    #[test]
    fn test_parse_bulk_response_invalid() {
        assert!(OpenSearchBackend::parse_bulk_response(&json!({})).is_err());
        assert!(OpenSearchBackend::parse_bulk_response(&json!({"errors": true})).is_err());
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = OpenSearchBackend::new(OpenSearchConfig::new("not a url"));
        assert!(matches!(result, Err(SearchError::ConnectionError(_))));
    }
}
