//! Field values and the raw event mapping.
//!
//! Records arrive as MessagePack maps with loosely typed values. They are
//! decoded into a [`RawEvent`] before classification.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The field that selects which normalization rules apply to an event.
pub const TYPE_FIELD: &str = "type";

/// A single decoded field value.
///
/// Strings that were encoded as MessagePack `bin` are accepted as long as
/// they are valid UTF-8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Borrow the value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce the value to an integer.
    ///
    /// Strings are parsed after trimming surrounding whitespace, floats are
    /// truncated toward zero. Anything that does not represent a finite
    /// integer yields `None`.
    pub fn coerce_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            FieldValue::Float(f) => {
                let truncated = f.trunc();
                if truncated.is_finite()
                    && truncated >= i64::MIN as f64
                    && truncated <= i64::MAX as f64
                {
                    Some(truncated as i64)
                } else {
                    None
                }
            }
            FieldValue::Str(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Coerce the value to a finite float.
    pub fn coerce_float(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Float(f) => *f,
            FieldValue::Int(i) => *i as f64,
            FieldValue::Bool(b) => f64::from(u8::from(*b)),
            FieldValue::Str(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Render a scalar as text. Containers and null have no text form.
    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Str(s) => Some(s),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Null | FieldValue::List(_) | FieldValue::Map(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::List(items) => write!(f, "[{} items]", items.len()),
            FieldValue::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A decoded record before classification: field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEvent {
    fields: BTreeMap<String, FieldValue>,
}

impl RawEvent {
    /// Create an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `type` discriminator, if present and a string.
    pub fn event_type(&self) -> Option<&str> {
        self.fields.get(TYPE_FIELD).and_then(FieldValue::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Borrow a field as a string slice, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }
}

impl FromIterator<(String, FieldValue)> for RawEvent {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RawEvent {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> RawEvent {
        let mut tags = BTreeMap::new();
        tags.insert("env".to_string(), FieldValue::from("prod"));

        let mut event = RawEvent::new();
        event.insert("type", "access-log");
        event.insert("message", "10/Oct/2023:13:55:36 -0700|1.2.3.4");
        event.insert("@version", 1_i64);
        event.insert("ratio", 0.25_f64);
        event.insert("sampled", true);
        event.insert("missing", FieldValue::Null);
        event.insert(
            "tags",
            FieldValue::List(vec![FieldValue::from("nginx"), FieldValue::from("edge")]),
        );
        event.insert("labels", FieldValue::Map(tags));
        event
    }

    #[test]
    fn test_msgpack_roundtrip() {
        let event = sample_event();

        let encoded = rmp_serde::to_vec(&event).unwrap();
        let decoded: RawEvent = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(decoded, event);

        let reencoded = rmp_serde::to_vec(&decoded).unwrap();
        assert_eq!(reencoded, encoded);
    }

    #[test]
    fn test_decode_accepts_binary_strings() {
        let mut fields = BTreeMap::new();
        fields.insert("type", BinValue(b"error-log"));
        let encoded = rmp_serde::to_vec(&fields).unwrap();

        let decoded: RawEvent = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(decoded.event_type(), Some("error-log"));
    }

    /// Encodes as MessagePack `bin`, the way older producers pack strings.
    struct BinValue(&'static [u8]);

    impl Serialize for BinValue {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_bytes(self.0)
        }
    }

    #[test]
    fn test_decode_rejects_corrupt_payload() {
        let encoded = rmp_serde::to_vec(&sample_event()).unwrap();
        let truncated = &encoded[..encoded.len() / 2];

        assert!(rmp_serde::from_slice::<RawEvent>(truncated).is_err());
        assert!(rmp_serde::from_slice::<RawEvent>(&[0xc1, 0x00]).is_err());
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(FieldValue::from("200").coerce_int(), Some(200));
        assert_eq!(FieldValue::from(" 404 ").coerce_int(), Some(404));
        assert_eq!(FieldValue::from(512_i64).coerce_int(), Some(512));
        assert_eq!(FieldValue::from(3.9_f64).coerce_int(), Some(3));
        assert_eq!(FieldValue::from("-").coerce_int(), None);
        assert_eq!(FieldValue::from("1.5").coerce_int(), None);
        assert_eq!(FieldValue::from(f64::NAN).coerce_int(), None);
        assert_eq!(FieldValue::Null.coerce_int(), None);
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(FieldValue::from("0.01").coerce_float(), Some(0.01));
        assert_eq!(FieldValue::from(2_i64).coerce_float(), Some(2.0));
        assert_eq!(FieldValue::from("-").coerce_float(), None);
        assert_eq!(FieldValue::from("").coerce_float(), None);
        assert_eq!(FieldValue::from("nan").coerce_float(), None);
    }

    #[test]
    fn test_into_text() {
        assert_eq!(FieldValue::from("a").into_text(), Some("a".to_string()));
        assert_eq!(FieldValue::from(7_i64).into_text(), Some("7".to_string()));
        assert_eq!(FieldValue::List(vec![]).into_text(), None);
    }

    #[test]
    fn test_event_type_requires_string() {
        let mut event = RawEvent::new();
        assert_eq!(event.event_type(), None);

        event.insert("type", 5_i64);
        assert_eq!(event.event_type(), None);

        event.insert("type", "custom");
        assert_eq!(event.event_type(), Some("custom"));
    }
}
