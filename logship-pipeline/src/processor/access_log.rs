//! Access log normalization.
//!
//! Access log records carry the raw nginx line in `message`, with fields
//! separated by `|` in the order of [`ACCESS_LOG_FIELDS`].

use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::processor::time_cache::{now_timestamp, TimeParseCache};
use logship_shared::event::QUERY_PARAM_PREFIX;
use logship_shared::{AccessLogEvent, FieldValue, RawEvent};

/// Fields of a pipe-delimited access log line, in order.
pub const ACCESS_LOG_FIELDS: [&str; 15] = [
    "time_local",
    "remote_addr",
    "server_protocol",
    "request_method",
    "http_host",
    "request",
    "status",
    "body_bytes_sent",
    "request_time",
    "upstream_response_time",
    "upstream_addr",
    "upstream_status",
    "http_referer",
    "http_x_forwarded_for",
    "http_user_agent",
];

/// Normalize an access log record.
pub fn normalize(mut raw: RawEvent, times: &mut TimeParseCache) -> AccessLogEvent {
    if let Some(message) = raw.get_str("message").map(str::to_owned) {
        // The last field takes the remainder, so user agents may contain `|`.
        for (field, chunk) in ACCESS_LOG_FIELDS
            .iter()
            .zip(message.splitn(ACCESS_LOG_FIELDS.len(), '|'))
        {
            raw.insert(*field, chunk);
        }
    }

    let timestamp = match raw.remove("time_local") {
        Some(FieldValue::Str(time)) => Some(times.get_or_now(&time)),
        Some(_) => Some(now_timestamp()),
        None => raw.remove("@timestamp").and_then(FieldValue::into_text),
    };

    let request = text(&mut raw, "request");
    let query_params = query_params(&mut raw, request.as_deref());
    let api_key = query_params
        .get(&format!("{}key", QUERY_PARAM_PREFIX))
        .cloned()
        .or_else(|| text(&mut raw, "api_key"));

    AccessLogEvent {
        timestamp,
        version: raw.remove("@version"),
        host: raw.remove("host"),
        event_type: text(&mut raw, "type").unwrap_or_default(),
        remote_addr: text(&mut raw, "remote_addr"),
        server_protocol: text(&mut raw, "server_protocol"),
        request_method: text(&mut raw, "request_method"),
        http_host: text(&mut raw, "http_host"),
        request,
        status: int(&mut raw, "status"),
        body_bytes_sent: int(&mut raw, "body_bytes_sent"),
        request_time: float(&mut raw, "request_time"),
        api_key,
        upstream_response_time: float(&mut raw, "upstream_response_time"),
        upstream_addr: text(&mut raw, "upstream_addr"),
        upstream_status: int(&mut raw, "upstream_status"),
        http_referer: text(&mut raw, "http_referer"),
        http_x_forwarded_for: text(&mut raw, "http_x_forwarded_for"),
        http_user_agent: text(&mut raw, "http_user_agent"),
        tags: raw.remove("tags"),
        query_params,
    }
}

/// Collect `http_get_*` fields: those already on the record, then the
/// parameters of the request's query string.
fn query_params(raw: &mut RawEvent, request: Option<&str>) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = raw
        .iter()
        .filter(|(key, _)| key.starts_with(QUERY_PARAM_PREFIX))
        .filter_map(|(key, value)| value.clone().into_text().map(|text| (key.clone(), text)))
        .collect();

    if let Some(query) = request.and_then(query_string) {
        params.extend(
            form_urlencoded::parse(query.as_bytes())
                .filter(|(name, value)| !name.is_empty() && !value.is_empty())
                .map(|(name, value)| (format!("{}{}", QUERY_PARAM_PREFIX, name), value.into_owned())),
        );
    }

    params
}

/// The query string of a request line: the text after `?` up to the first
/// whitespace.
fn query_string(request: &str) -> Option<&str> {
    let (_, rest) = request.split_once('?')?;
    rest.split(char::is_whitespace).next()
}

fn text(raw: &mut RawEvent, key: &str) -> Option<String> {
    raw.remove(key).and_then(FieldValue::into_text)
}

fn int(raw: &mut RawEvent, key: &str) -> Option<i64> {
    raw.remove(key).and_then(|value| value.coerce_int())
}

fn float(raw: &mut RawEvent, key: &str) -> Option<f64> {
    raw.remove(key).and_then(|value| value.coerce_float())
}
