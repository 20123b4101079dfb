//! Timestamp parsing with a short-lived memo.
//!
//! Log lines from the same second share the same timestamp text, so parsed
//! results are cached per format for a short time.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::time::Instant;

/// Output format of every normalized `@timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

/// Access log time, e.g. `10/Oct/2023:13:55:36 -0700`.
const ACCESS_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Error log time, e.g. `2023/10/10 20:55:36`, always UTC.
const ERROR_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_CAPACITY: usize = 4096;

/// Parse an access log time into the normalized UTC format.
pub fn parse_access_time(raw: &str) -> Option<String> {
    DateTime::parse_from_str(raw.trim(), ACCESS_TIME_FORMAT)
        .ok()
        .map(|time| format_timestamp(time.with_timezone(&Utc)))
}

/// Parse an error log time into the normalized UTC format.
pub fn parse_error_time(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw.trim(), ERROR_TIME_FORMAT)
        .ok()
        .map(|time| format_timestamp(time.and_utc()))
}

/// The current wall-clock time in the normalized format.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

struct CachedTime {
    value: String,
    parsed_at: Instant,
}

/// Memo of raw time text to its normalized form.
///
/// Entries older than the TTL are never returned. Only successful parses
/// are stored, and the number of entries is bounded: when the cache is full
/// expired entries are evicted first, then everything.
pub struct TimeParseCache {
    parse: fn(&str) -> Option<String>,
    entries: HashMap<String, CachedTime>,
    ttl: Duration,
    capacity: usize,
}

impl TimeParseCache {
    pub fn new(parse: fn(&str) -> Option<String>) -> Self {
        Self::with_limits(parse, DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_limits(parse: fn(&str) -> Option<String>, ttl: Duration, capacity: usize) -> Self {
        Self {
            parse,
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Cache for access log times.
    pub fn access_log() -> Self {
        Self::new(parse_access_time)
    }

    /// Cache for error log times.
    pub fn error_log() -> Self {
        Self::new(parse_error_time)
    }

    /// Normalize `raw`, or `None` if it does not parse.
    pub fn get(&mut self, raw: &str) -> Option<String> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(raw) {
            if now.duration_since(entry.parsed_at) <= self.ttl {
                return Some(entry.value.clone());
            }
        }

        let value = (self.parse)(raw)?;
        self.store(raw, value.clone(), now);
        Some(value)
    }

    /// Normalize `raw`, falling back to the current time.
    pub fn get_or_now(&mut self, raw: &str) -> String {
        self.get(raw).unwrap_or_else(now_timestamp)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn store(&mut self, raw: &str, value: String, now: Instant) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(raw) {
            let ttl = self.ttl;
            self.entries
                .retain(|_, entry| now.duration_since(entry.parsed_at) <= ttl);
            if self.entries.len() >= self.capacity {
                self.entries.clear();
            }
        }

        self.entries.insert(
            raw.to_string(),
            CachedTime {
                value,
                parsed_at: now,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static PARSE_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_parse(raw: &str) -> Option<String> {
        PARSE_CALLS.fetch_add(1, Ordering::SeqCst);
        parse_access_time(raw)
    }

    #[test]
    fn test_parse_access_time_converts_to_utc() {
        assert_eq!(
            parse_access_time("10/Oct/2023:13:55:36 -0700").as_deref(),
            Some("2023-10-10T20:55:36.000Z")
        );
        assert_eq!(
            parse_access_time("01/Jan/2024:00:30:00 +0100").as_deref(),
            Some("2023-12-31T23:30:00.000Z")
        );
    }

    #[test]
    fn test_parse_error_time_is_utc() {
        assert_eq!(
            parse_error_time("2023/10/10 20:55:36").as_deref(),
            Some("2023-10-10T20:55:36.000Z")
        );
    }

    #[test]
    fn test_unparseable_times() {
        assert_eq!(parse_access_time("yesterday"), None);
        assert_eq!(parse_access_time("10/Foo/2023:13:55:36 -0700"), None);
        assert_eq!(parse_error_time("2023-10-10 20:55:36"), None);
    }

    #[test]
    fn test_now_timestamp_shape() {
        let now = now_timestamp();
        assert_eq!(now.len(), "2023-10-10T20:55:36.000Z".len());
        assert!(now.ends_with(".000Z"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hits_within_ttl_and_reparses_after() {
        let mut cache =
            TimeParseCache::with_limits(counting_parse, Duration::from_secs(60), 16);
        let raw = "10/Oct/2023:13:55:36 -0700";
        let before = PARSE_CALLS.load(Ordering::SeqCst);

        assert_eq!(cache.get(raw).as_deref(), Some("2023-10-10T20:55:36.000Z"));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get(raw).as_deref(), Some("2023-10-10T20:55:36.000Z"));
        assert_eq!(PARSE_CALLS.load(Ordering::SeqCst) - before, 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get(raw).as_deref(), Some("2023-10-10T20:55:36.000Z"));
        assert_eq!(PARSE_CALLS.load(Ordering::SeqCst) - before, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_parse_is_not_cached() {
        let mut cache = TimeParseCache::access_log();

        assert_eq!(cache.get("garbage"), None);
        assert!(cache.is_empty());
        assert!(cache.get_or_now("garbage").ends_with(".000Z"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_is_bounded() {
        let mut cache = TimeParseCache::with_limits(parse_error_time, Duration::from_secs(60), 2);

        cache.get("2023/10/10 20:55:36");
        cache.get("2023/10/10 20:55:37");
        assert_eq!(cache.len(), 2);

        cache.get("2023/10/10 20:55:38");
        assert!(cache.len() <= 2);
        assert_eq!(
            cache.get("2023/10/10 20:55:38").as_deref(),
            Some("2023-10-10T20:55:38.000Z")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_evicts_expired_entries_first() {
        let mut cache = TimeParseCache::with_limits(parse_error_time, Duration::from_secs(60), 2);

        cache.get("2023/10/10 20:55:36");
        tokio::time::advance(Duration::from_secs(90)).await;
        cache.get("2023/10/10 20:55:37");
        cache.get("2023/10/10 20:55:38");

        assert_eq!(cache.len(), 2);
    }
}
