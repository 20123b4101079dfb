//! Normalized event types.
//!
//! After decoding, every record is classified by its `type` discriminator
//! into one of the [`Event`] variants. Access and error log variants carry
//! a strongly typed field set; anything else passes through as a
//! [`RawEvent`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::{FieldValue, RawEvent};

/// `type` values recognized as web-server access logs.
pub const ACCESS_LOG_TYPES: &[&str] = &["access-log", "nginx_accesslog"];

/// `type` values recognized as web-server error logs.
pub const ERROR_LOG_TYPES: &[&str] = &["error-log", "nginx_errorlog"];

/// Prefix of the fields projected from request query parameters.
pub const QUERY_PARAM_PREFIX: &str = "http_get_";

/// Which normalization rule set applies to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    AccessLog,
    ErrorLog,
    Other,
}

impl EventKind {
    /// Classify an event by its `type` discriminator.
    pub fn classify(event_type: &str) -> Self {
        if ACCESS_LOG_TYPES.contains(&event_type) {
            EventKind::AccessLog
        } else if ERROR_LOG_TYPES.contains(&event_type) {
            EventKind::ErrorLog
        } else {
            EventKind::Other
        }
    }
}

/// Error log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warn,
    Error,
    Crit,
    Alert,
    Emerg,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Crit => "crit",
            Severity::Alert => "alert",
            Severity::Emerg => "emerg",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "notice" => Ok(Severity::Notice),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "crit" => Ok(Severity::Crit),
            "alert" => Ok(Severity::Alert),
            "emerg" => Ok(Severity::Emerg),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized web-server access log entry.
///
/// Only allow-listed fields survive normalization. Fields that failed
/// coercion are `None` and are omitted from the indexed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessLogEvent {
    #[serde(rename = "@timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "@version", skip_serializing_if = "Option::is_none")]
    pub version: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<FieldValue>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_bytes_sent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_response_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_x_forwarded_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<FieldValue>,
    /// Request query parameters, keyed by their full `http_get_*` field name.
    #[serde(flatten)]
    pub query_params: BTreeMap<String, String>,
}

impl AccessLogEvent {
    /// Look up a query parameter by its bare name (without `http_get_`).
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .get(&format!("{}{}", QUERY_PARAM_PREFIX, name))
            .map(String::as_str)
    }
}

/// A normalized web-server error log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorLogEvent {
    #[serde(rename = "@timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "@version", skip_serializing_if = "Option::is_none")]
    pub version: Option<FieldValue>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
}

/// An event after normalization, tagged by its `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Access(AccessLogEvent),
    Error(ErrorLogEvent),
    Other(RawEvent),
}

impl Event {
    /// The `type` discriminator, used as the document kind when indexing.
    pub fn event_type(&self) -> &str {
        match self {
            Event::Access(event) => &event.event_type,
            Event::Error(event) => &event.event_type,
            Event::Other(event) => event.event_type().unwrap_or_default(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Access(_) => EventKind::AccessLog,
            Event::Error(_) => EventKind::ErrorLog,
            Event::Other(_) => EventKind::Other,
        }
    }

    /// The normalized `@timestamp`, if the event carries one.
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Event::Access(event) => event.timestamp.as_deref(),
            Event::Error(event) => event.timestamp.as_deref(),
            Event::Other(event) => event.get_str("@timestamp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify() {
        assert_eq!(EventKind::classify("access-log"), EventKind::AccessLog);
        assert_eq!(EventKind::classify("nginx_accesslog"), EventKind::AccessLog);
        assert_eq!(EventKind::classify("error-log"), EventKind::ErrorLog);
        assert_eq!(EventKind::classify("nginx_errorlog"), EventKind::ErrorLog);
        assert_eq!(EventKind::classify("syslog"), EventKind::Other);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("crit".parse::<Severity>(), Ok(Severity::Crit));
        assert!("fatal".parse::<Severity>().is_err());
        assert!("ERROR".parse::<Severity>().is_err());
    }

    #[test]
    fn test_access_event_serialization_omits_missing_fields() {
        let mut event = AccessLogEvent {
            event_type: "access-log".to_string(),
            status: Some(200),
            request_time: Some(0.01),
            ..Default::default()
        };
        event
            .query_params
            .insert("http_get_key".to_string(), "abc123".to_string());

        let value = serde_json::to_value(Event::Access(event)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "access-log",
                "status": 200,
                "request_time": 0.01,
                "http_get_key": "abc123"
            })
        );
    }

    #[test]
    fn test_error_event_serialization() {
        let event = ErrorLogEvent {
            timestamp: Some("2023-10-10T13:55:36.000Z".to_string()),
            event_type: "error-log".to_string(),
            severity: Some(Severity::Error),
            errmsg: Some("upstream timed out".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(Event::Error(event)).unwrap();
        assert_eq!(value["severity"], json!("error"));
        assert_eq!(value["@timestamp"], json!("2023-10-10T13:55:36.000Z"));
        assert!(value.get("host").is_none());
    }

    #[test]
    fn test_other_event_passes_fields_through() {
        let mut raw = RawEvent::new();
        raw.insert("type", "syslog");
        raw.insert("pid", 42_i64);

        let event = Event::Other(raw);
        assert_eq!(event.event_type(), "syslog");
        assert_eq!(event.kind(), EventKind::Other);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "syslog", "pid": 42})
        );
    }
}
