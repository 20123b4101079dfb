//! # Logship Shared
//!
//! Data model shared by every stage of the log shipper:
//!
//! - [`FieldValue`] and [`RawEvent`]: the decoded, not yet classified record
//! - [`Event`]: a record after normalization, tagged by its `type`
//! - [`IndexableDocument`]: an event packaged for the search backend

pub mod document;
pub mod event;
pub mod value;

pub use document::{IndexTemplate, IndexableDocument, TemplateError};
pub use event::{AccessLogEvent, ErrorLogEvent, Event, EventKind, Severity};
pub use value::{FieldValue, RawEvent};
