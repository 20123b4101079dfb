//! Indexable documents and index name templates.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::event::Event;

/// Error returned for an unusable index name template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Index template is empty")]
    Empty,

    #[error("Index template contains an invalid format specifier: {0}")]
    InvalidSpecifier(String),
}

/// A strftime-style template for daily index names, e.g. `logstash-%Y.%m.%d`.
///
/// The template is validated once at construction so rendering never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTemplate {
    template: String,
}

impl IndexTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(TemplateError::Empty);
        }
        if StrftimeItems::new(&template).any(|item| matches!(item, Item::Error)) {
            return Err(TemplateError::InvalidSpecifier(template));
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Render the index name for the given instant (UTC date).
    pub fn render(&self, at: DateTime<Utc>) -> String {
        at.format(&self.template).to_string()
    }

    /// Render the index name for the current UTC date.
    pub fn render_now(&self) -> String {
        self.render(Utc::now())
    }
}

/// An event packaged for the search backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexableDocument {
    /// Target index name.
    pub index: String,
    /// Document kind; the event's `type` discriminator.
    pub kind: String,
    /// Document body.
    pub body: Value,
}

impl IndexableDocument {
    /// Build a document for `event` targeting `index`.
    pub fn from_event(event: &Event, index: impl Into<String>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            index: index.into(),
            kind: event.event_type().to_string(),
            body: serde_json::to_value(event)?,
        })
    }
}
