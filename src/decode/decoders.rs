//! Decoder implementations
//!
//! Each decoder handles a specific response format.

use super::types::{decode_text, RecordDecoder};
use crate::error::{Error, Result};
use crate::types::{FieldValue, Record};
use serde_json::Value;

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// Path to the record list
    record_path: Option<String>,
    /// Treat the whole document as the record list when the path is absent
    fallback_to_root: bool,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
            fallback_to_root: false,
        }
    }

    /// Use the whole document when the record path does not resolve
    #[must_use]
    pub fn or_root(mut self) -> Self {
        self.fallback_to_root = true;
        self
    }

    /// Parse a body into a JSON value
    pub fn parse(body: &[u8]) -> Result<Value> {
        serde_json::from_slice(body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })
    }

    /// Extract records from an already parsed document
    pub fn records(&self, value: &Value) -> Result<Vec<Record>> {
        let rows = self.extract_records(value)?;
        Ok(rows
            .into_iter()
            .filter(|row| !row.is_null())
            .map(Record::from_json)
            .collect())
    }

    /// Extract records from a JSON value using a path
    fn extract_records(&self, value: &Value) -> Result<Vec<Value>> {
        let Some(path) = &self.record_path else {
            return Ok(root_records(value));
        };

        // jsonpath-rust only for wildcards, negative indices stay on the simple path
        if path.contains('*') && !path.contains("[-") {
            return extract_with_jsonpath(value, path);
        }

        match extract_simple_path(value, path) {
            Some(Value::Array(arr)) => Ok(arr),
            Some(Value::Null) | None if self.fallback_to_root => Ok(root_records(value)),
            Some(Value::Null) | None => Ok(vec![]),
            Some(v) => Ok(vec![v]),
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<Vec<Record>> {
        let value = Self::parse(body)?;
        self.records(&value)
    }
}

fn root_records(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(arr) => arr.clone(),
        Value::Null => vec![],
        _ => vec![value.clone()],
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder backed by the `csv` crate.
///
/// The first row is the header. Rows whose field count differs from the
/// header are skipped, as are unparseable rows. Empty cells become null.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: u8,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvDecoder {
    /// Create a new CSV decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CSV decoder with a custom delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl RecordDecoder for CsvDecoder {
    fn decode(&self, body: &[u8]) -> Result<Vec<Record>> {
        let text = decode_text(body);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(Error::csv)?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(String::is_empty) {
            return Ok(vec![]);
        }

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in reader.records() {
            let row = match row {
                Ok(row) if row.len() == headers.len() => row,
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            let record: Record = headers
                .iter()
                .zip(row.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| {
                    let value = if cell.is_empty() {
                        FieldValue::Null
                    } else {
                        FieldValue::Text(cell.to_string())
                    };
                    (header.clone(), value)
                })
                .collect();
            records.push(record);
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Skipped malformed CSV rows");
        }
        Ok(records)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a value using simple dot-notation path
fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        // Array indexing like "data[0]" or "items[-1]"
        let Some(bracket_pos) = part.find('[') else {
            current = current.get(part)?;
            continue;
        };

        let name = &part[..bracket_pos];
        let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

        if !name.is_empty() {
            current = current.get(name)?;
        }

        if index_str == "*" {
            return Some(current.clone());
        }

        let index = index_str.parse::<i64>().ok()?;
        let Value::Array(arr) = current else {
            return None;
        };
        let len = i64::try_from(arr.len()).ok()?;
        let idx = if index < 0 { len + index } else { index };
        current = arr.get(usize::try_from(idx).ok()?)?;
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath: {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
