//! Feed entry parsing.
//!
//! A single table-driven parser turns a [`FeedEntry`] into a
//! [`CanonicalRecord`] according to the category's [`CategorySpec`]. Each
//! category keeps its own required fields, date formats and guid rule in the
//! catalog; the parser only interprets them.

pub mod catalog;
pub mod normalize;
pub mod types;

use std::collections::HashMap;

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

pub use catalog::{Category, CategorySpec};
pub use types::{CanonicalRecord, Column, FeedEntry, FieldValue, Reject};

use catalog::{FieldKind, FieldRule, GuidRule, LinkLayout, Source, PUBLISHED_COLUMN};
use normalize::{iso_timestamp, RFC3339, keyed_fields, labeled_value, parse_date, parse_datetime, parse_decimal, split_links, value_after};

/// Parse one entry. A record missing anything its category requires is
/// rejected as a whole.
pub fn parse_entry(spec: &CategorySpec, entry: &FeedEntry) -> Result<CanonicalRecord, Reject> {
    let title = entry.title().ok_or(Reject::MissingTitle)?.to_string();
    let link = entry.link();
    if spec.requires_link && link.is_none() { return Err(Reject::MissingLink); }
    let description = entry.description();
    if spec.requires_description && description.is_none() { return Err(Reject::MissingDescription); }

    let published = match spec.published {
        Some(rule) => {
            // items without a pubDate carry the Dublin Core date instead
            let dt = parse_datetime(entry.published(), rule.formats)
                .or_else(|| parse_datetime(entry.published(), &[RFC3339]));
            if dt.is_none() && rule.required {
                return Err(Reject::Published(entry.published.clone()));
            }
            dt
        }
        None => None,
    };

    let mut columns = Vec::with_capacity(spec.fields.len() + 3);
    match spec.links {
        LinkLayout::Single(name) => {
            columns.push(Column { name, value: FieldValue::Text(link.map(str::to_string)) });
        }
        LinkLayout::Split { primary, secondary } => {
            let (pdf, xml) = split_links(link);
            columns.push(Column { name: primary, value: FieldValue::Text(pdf) });
            columns.push(Column { name: secondary, value: FieldValue::Text(xml) });
        }
    }

    let keyed = if spec.fields.iter().any(|f| matches!(f.source, Source::Key(_))) {
        keyed_fields(description.unwrap_or_default(), '|')
    } else {
        HashMap::new()
    };

    let mut raw_values: HashMap<&'static str, String> = HashMap::new();
    for rule in spec.fields {
        let raw = match rule.source {
            Source::Label { label, delimiters } => description.and_then(|d| labeled_value(d, label, delimiters)),
            Source::Key(k) => keyed.get(k).cloned(),
            Source::Description => description.map(str::to_string),
            Source::TitleAfter(marker) => value_after(&title, marker),
        };
        let value = convert(rule, raw.as_deref())?;
        if let Some(raw) = raw { raw_values.insert(rule.column, raw); }
        columns.push(Column { name: rule.column, value });
    }

    if spec.published.is_some() {
        columns.push(Column { name: PUBLISHED_COLUMN, value: FieldValue::Timestamp(published) });
    }

    let guid = derive_guid(spec.guid, &title, link, description, published.as_ref(), &raw_values)?;
    Ok(CanonicalRecord { category: spec.category, guid, title, columns })
}

fn convert(rule: &FieldRule, raw: Option<&str>) -> Result<FieldValue, Reject> {
    let value = match rule.kind {
        FieldKind::Text => FieldValue::Text(raw.map(str::to_string)),
        FieldKind::Date(formats) => FieldValue::Date(parse_date(raw, formats)),
        FieldKind::Timestamp(formats) => FieldValue::Timestamp(parse_datetime(raw, formats)),
        FieldKind::Decimal => FieldValue::Decimal(parse_decimal(raw)),
    };
    if rule.required && value.is_absent() {
        return Err(match raw {
            Some(r) => Reject::Unparsable { column: rule.column, raw: r.to_string() },
            None => Reject::MissingField(rule.column),
        });
    }
    Ok(value)
}

fn derive_guid(
    rule: GuidRule,
    title: &str,
    link: Option<&str>,
    description: Option<&str>,
    published: Option<&NaiveDateTime>,
    raw_values: &HashMap<&'static str, String>,
) -> Result<String, Reject> {
    if let GuidRule::TitleAnd(column) = rule {
        let value = raw_values.get(column).ok_or(Reject::MissingField(column))?;
        return Ok(format!("{title}-{value}"));
    }
    if let Some(link) = link {
        return Ok(link.to_string());
    }
    if rule == GuidRule::LinkOrContentHash {
        if let Some(description) = description {
            return Ok(content_hash(title, description));
        }
    }
    match published {
        Some(dt) => Ok(format!("{title}-{}", iso_timestamp(dt))),
        None => Err(Reject::NoIdentifier),
    }
}

/// Stable key for entries published without a link.
pub fn content_hash(title: &str, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}
