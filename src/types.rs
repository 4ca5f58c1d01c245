//! Common types used throughout market-ingest
//!
//! This module contains the record model, write modes and other
//! shared type definitions used across multiple modules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Records
// ============================================================================

/// A single field value as produced by a fetcher
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Arrays and objects, stored as compact JSON text
    Nested(JsonValue),
}

impl FieldValue {
    /// Whether the value is an explicit null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert back into a JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Bool(b) => JsonValue::Bool(*b),
            FieldValue::Int(i) => JsonValue::from(*i),
            FieldValue::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
            }
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Nested(v) => v.clone(),
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                // Above i64::MAX; a float would lose digits
                None if n.is_u64() => FieldValue::Text(n.to_string()),
                None => n
                    .as_f64()
                    .map_or_else(|| FieldValue::Text(n.to_string()), FieldValue::Float),
            },
            JsonValue::String(s) => FieldValue::Text(s),
            nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => FieldValue::Nested(nested),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
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

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// An ordered mapping from source field name to value.
///
/// Field sets may differ between records of the same batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonObject", into = "JsonObject")]
pub struct Record {
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Build a record from any JSON value; non-objects land in a `value` field
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(obj) => obj.into(),
            other => Self::new().with("value", other),
        }
    }

    /// Convert a list of JSON values into records
    pub fn from_json_rows(rows: Vec<JsonValue>) -> Vec<Self> {
        rows.into_iter().map(Self::from_json).collect()
    }

    /// Flatten a single object into `(key, value)` rows.
    ///
    /// `context` fields are copied onto every row ahead of the pair.
    pub fn key_value_rows(obj: JsonObject, context: &Record) -> Vec<Self> {
        obj.into_iter()
            .map(|(key, value)| {
                let mut row = context.clone();
                row.insert("key", key);
                row.insert("value", value);
                row
            })
            .collect()
    }

    /// Convert into a JSON object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.clone().into())
    }
}

impl From<JsonObject> for Record {
    fn from(obj: JsonObject) -> Self {
        Self {
            fields: obj
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from(v)))
                .collect(),
        }
    }
}

impl From<Record> for JsonObject {
    fn from(record: Record) -> Self {
        record
            .fields
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// ============================================================================
// Write Mode
// ============================================================================

/// How a batch is written to its destination table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WriteMode {
    /// Every record becomes a new row
    #[default]
    Append,
    /// Insert or update by the declared key fields
    Upsert { keys: Vec<String> },
}

impl WriteMode {
    /// Upsert keyed by the given source field names
    pub fn upsert<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WriteMode::Upsert {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Key fields, empty for append
    pub fn keys(&self) -> &[String] {
        match self {
            WriteMode::Append => &[],
            WriteMode::Upsert { keys } => keys,
        }
    }
}

/// Extra columns a destination table carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Auto-increment `id` column
    #[serde(default = "default_true")]
    pub identity: bool,
    /// `created_at` insertion timestamp
    #[serde(default)]
    pub created_at: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            identity: true,
            created_at: false,
        }
    }
}

impl TableOptions {
    /// Identity plus insertion timestamp
    pub fn timestamped() -> Self {
        Self {
            identity: true,
            created_at: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
