use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One item from an exchange feed. Nothing is guaranteed to be present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
}

impl FeedEntry {
    pub fn title(&self) -> Option<&str> { non_empty(self.title.as_deref()) }
    pub fn link(&self) -> Option<&str> { non_empty(self.link.as_deref()) }
    pub fn description(&self) -> Option<&str> { non_empty(self.description.as_deref()) }
    pub fn published(&self) -> Option<&str> { non_empty(self.published.as_deref()) }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Timestamp(Option<NaiveDateTime>),
    Decimal(Option<f64>),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Text(v) => v.is_none(),
            FieldValue::Date(v) => v.is_none(),
            FieldValue::Timestamp(v) => v.is_none(),
            FieldValue::Decimal(v) => v.is_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub value: FieldValue,
}

/// A parsed feed entry, ready to insert. `columns` follow the insert order of
/// the category's table (see `CategorySpec::value_columns`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub category: super::Category,
    pub guid: String,
    pub title: String,
    pub columns: Vec<Column>,
}

// column lookups for assertions and the in-memory store
#[cfg(test)]
impl CanonicalRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Text(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name)? {
            FieldValue::Date(v) => *v,
            _ => None,
        }
    }

    pub fn timestamp(&self, name: &str) -> Option<NaiveDateTime> {
        match self.get(name)? {
            FieldValue::Timestamp(v) => *v,
            _ => None,
        }
    }

    pub fn decimal(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            FieldValue::Decimal(v) => *v,
            _ => None,
        }
    }
}

/// Why an entry was dropped. Rejects are logged and counted, never raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Reject {
    #[error("missing title")]
    MissingTitle,
    #[error("missing link")]
    MissingLink,
    #[error("missing description")]
    MissingDescription,
    #[error("missing or unparsable published date {0:?}")]
    Published(Option<String>),
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("unparsable {column}: {raw:?}")]
    Unparsable { column: &'static str, raw: String },
    #[error("no usable identifier")]
    NoIdentifier,
}
