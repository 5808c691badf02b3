//! Typed catalog filters.
//!
//! Each filter kind is a variant of [`Filter`], so callers never inspect
//! loosely-shaped filter objects. Records expose their filterable fields
//! through [`Filterable`]; a filter on a field the record does not have never
//! matches.

use serde::{Deserialize, Serialize};

use crate::media::{MediaItem, MediaType, Screen, ScreenStatus};

/// Field names understood by the built-in [`Filterable`] impls.
pub mod fields {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const DURATION: &str = "duration";
    pub const CATEGORY: &str = "category";
    pub const ONLINE: &str = "online";
}

/// A single field value extracted from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

/// Records that can be filtered.
pub trait Filterable {
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}

/// One filter criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Inclusive numeric range; a missing bound is unbounded.
    Range {
        field: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Field value must equal one of `values`. An empty set matches everything.
    MultiSelect { field: String, values: Vec<String> },
    Boolean { field: String, value: bool },
    /// Case-insensitive substring match. An empty query matches everything.
    Text { field: String, query: String },
}

impl Filter {
    pub fn matches<T: Filterable + ?Sized>(&self, record: &T) -> bool {
        match self {
            Filter::Range { field, min, max } => match record.field_value(field) {
                Some(FieldValue::Number(n)) => {
                    min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi)
                }
                _ => false,
            },
            Filter::MultiSelect { field, values } => {
                if values.is_empty() {
                    return true;
                }
                match record.field_value(field) {
                    Some(FieldValue::Text(t)) => values.iter().any(|v| v == &t),
                    _ => false,
                }
            }
            Filter::Boolean { field, value } => {
                matches!(record.field_value(field), Some(FieldValue::Bool(b)) if b == *value)
            }
            Filter::Text { field, query } => {
                let query = query.trim().to_lowercase();
                if query.is_empty() {
                    return true;
                }
                match record.field_value(field) {
                    Some(FieldValue::Text(t)) => t.to_lowercase().contains(&query),
                    _ => false,
                }
            }
        }
    }
}

/// Keep the records matching every filter, preserving order.
pub fn apply_filters<'a, T: Filterable>(records: &'a [T], filters: &[Filter]) -> Vec<&'a T> {
    records
        .iter()
        .filter(|r| filters.iter().all(|f| f.matches(*r)))
        .collect()
}

fn media_type_name(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Image => "image",
        MediaType::Video => "video",
        MediaType::App => "app",
    }
}

impl Filterable for MediaItem {
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            fields::NAME => Some(FieldValue::Text(self.name.clone())),
            fields::TYPE => Some(FieldValue::Text(media_type_name(self.media_type).to_string())),
            fields::DURATION => Some(FieldValue::Number(f64::from(self.duration))),
            fields::CATEGORY => Some(FieldValue::Text(self.category.clone())),
            _ => None,
        }
    }
}

impl Filterable for Screen {
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            fields::NAME => Some(FieldValue::Text(self.name.clone())),
            fields::ONLINE => Some(FieldValue::Bool(self.status == ScreenStatus::Online)),
            _ => None,
        }
    }
}
