//! Error log normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::processor::time_cache::{now_timestamp, TimeParseCache};
use logship_shared::{ErrorLogEvent, FieldValue, RawEvent, Severity};

/// An nginx error line, e.g.
/// `2023/10/10 20:55:36 [error] 1234#0: *42 open() "/x" failed`.
///
/// The `*<connection>` prefix of the message is optional.
pub static ERROR_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<time_local>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(?P<severity>debug|info|notice|warn|error|crit|alert|emerg)\] (?P<pid>\d+)#\d+: (?:\*\d+ )?(?P<errmsg>.+)$",
    )
    .unwrap()
});

const CAPTURED_FIELDS: [&str; 4] = ["time_local", "severity", "pid", "errmsg"];

/// Normalize an error log record.
///
/// A `message` that does not match the error line format leaves the
/// record's own fields in place.
pub fn normalize(mut raw: RawEvent, times: &mut TimeParseCache) -> ErrorLogEvent {
    if let Some(message) = raw.get_str("message").map(str::to_owned) {
        if let Some(captures) = ERROR_LINE_RE.captures(&message) {
            for field in CAPTURED_FIELDS {
                if let Some(value) = captures.name(field) {
                    raw.insert(field, value.as_str());
                }
            }
        }
    }

    let timestamp = match raw.remove("time_local") {
        Some(FieldValue::Str(time)) => Some(times.get_or_now(&time)),
        Some(_) => Some(now_timestamp()),
        None => raw.remove("@timestamp").and_then(FieldValue::into_text),
    };

    ErrorLogEvent {
        timestamp,
        version: raw.remove("@version"),
        event_type: text(&mut raw, "type").unwrap_or_default(),
        host: raw.remove("host"),
        severity: text(&mut raw, "severity").and_then(|s| s.parse::<Severity>().ok()),
        error: raw.remove("error"),
        errmsg: text(&mut raw, "errmsg"),
    }
}

fn text(raw: &mut RawEvent, key: &str) -> Option<String> {
    raw.remove(key).and_then(FieldValue::into_text)
}
