//! Flattening of per-source results into one ordered report.

pub mod format;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::dispatch::{Outcome, SourceResult};
use crate::source::{SourceId, Value};

pub const NO_DATA_LABEL: &str = "No data";
pub const ERROR_LABEL: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    Scalar(String),
    /// Ordered pairs; serialized as a JSON object in this order.
    Nested(Vec<(String, String)>),
}

impl Serialize for EntryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntryValue::Scalar(text) => serializer.serialize_str(text),
            EntryValue::Nested(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (key, value) in pairs {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Entry {
    pub source: SourceId,
    /// Heading the entry is grouped under.
    pub source_name: &'static str,
    pub label: String,
    pub value: EntryValue,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Report {
    pub title: String,
    pub entries: Vec<Entry>,
}

impl Report {
    /// Entries follow `results` order; a source's entries stay contiguous.
    pub fn from_results(title: impl Into<String>, results: &[SourceResult]) -> Self {
        let mut entries = Vec::new();
        for result in results {
            let source = result.source;
            let mut push = |label: String, value: EntryValue| {
                entries.push(Entry {
                    source,
                    source_name: source.display_name(),
                    label,
                    value,
                })
            };
            match &result.outcome {
                Outcome::Success(record) => {
                    for (label, value) in record.iter() {
                        push(label.to_string(), flatten(value));
                    }
                }
                Outcome::Empty(message) => {
                    push(NO_DATA_LABEL.to_string(), EntryValue::Scalar(message.clone()))
                }
                Outcome::Error(e) => push(ERROR_LABEL.to_string(), EntryValue::Scalar(e.to_string())),
            }
        }
        Self {
            title: title.into(),
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten(value: &Value) -> EntryValue {
    match value {
        Value::Text(text) => EntryValue::Scalar(text.clone()),
        Value::List(items) => EntryValue::Scalar(items.join(", ")),
        Value::Map(pairs) => EntryValue::Nested(pairs.clone()),
    }
}
