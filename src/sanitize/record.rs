//! Record-level sanitization: field names and value normalization

use super::ident::{sanitize_identifier, Ident};
use crate::types::{FieldValue, Record};
use indexmap::{IndexMap, IndexSet};

/// A record keyed by sanitized column with text-or-null values
pub type SanitizedRecord = IndexMap<Ident, Option<String>>;

/// Records of one batch after sanitization, with their column union
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizedBatch {
    /// Union of columns across all records, in first-seen order
    pub columns: Vec<Ident>,
    pub records: Vec<SanitizedRecord>,
}

impl SanitizedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const NULL_SENTINELS: &[&str] = &[
    "nan", "nat", "inf", "+inf", "-inf", "infinity", "+infinity", "-infinity", "none", "null",
];

/// Whether a text value stands for a missing or non-finite number
pub fn is_null_sentinel(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_SENTINELS
        .iter()
        .any(|s| trimmed.eq_ignore_ascii_case(s))
}

/// Normalize a field value into the stored text form
pub fn normalize_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        FieldValue::Bool(b) => Some(b.to_string()),
        FieldValue::Int(i) => Some(i.to_string()),
        FieldValue::Float(f) if !f.is_finite() => None,
        FieldValue::Float(f) => Some(f.to_string()),
        FieldValue::Text(s) if is_null_sentinel(s) => None,
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Nested(v) => Some(v.to_string()),
    }
}

/// Sanitize every field name and normalize every value.
///
/// When two source names sanitize to the same column the later one wins.
pub fn sanitize_record(record: &Record) -> SanitizedRecord {
    let mut out = SanitizedRecord::with_capacity(record.len());
    for (field, value) in record.iter() {
        out.insert(sanitize_identifier(field), normalize_value(value));
    }
    out
}

/// Sanitize a batch and collect the column union
pub fn sanitize_batch(records: &[Record]) -> SanitizedBatch {
    let mut columns: IndexSet<Ident> = IndexSet::new();
    let records: Vec<SanitizedRecord> = records
        .iter()
        .map(|record| {
            let sanitized = sanitize_record(record);
            for column in sanitized.keys() {
                if !columns.contains(column) {
                    columns.insert(column.clone());
                }
            }
            sanitized
        })
        .collect();

    SanitizedBatch {
        columns: columns.into_iter().collect(),
        records,
    }
}
