//! Safe SQL identifiers

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Auto-increment identity column
pub const ID_COLUMN: &str = "id";

/// Insertion timestamp column
pub const CREATED_AT_COLUMN: &str = "created_at";

const UNKNOWN_COLUMN: &str = "col_unknown";
const PREFIX: &str = "col_";

/// Words that must never appear as a bare identifier.
///
/// SQL keywords that collide in DuckDB or MySQL, plus the system columns.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "add", "all", "alter", "and", "any", "as", "asc", "between", "by", "case", "cast",
        "change", "check", "close", "column", "constraint", "create", "cross", "current",
        "current_date", "current_time", "current_timestamp", "database", "date", "default",
        "delete", "desc", "distinct", "drop", "else", "end", "except", "exists", "false",
        "fetch", "for", "foreign", "from", "full", "grant", "group", "having", "if", "in",
        "index", "inner", "insert", "intersect", "interval", "into", "is", "join", "json",
        "key", "lateral", "leading", "left", "like", "limit", "natural", "not", "null",
        "offset", "on", "open", "or", "order", "outer", "primary", "references", "returning",
        "right", "select", "set", "some", "table", "then", "time", "timestamp", "to",
        "trailing", "true", "union", "unique", "update", "user", "using", "values", "when",
        "where", "window", "with",
        ID_COLUMN, CREATED_AT_COLUMN,
    ]
    .into_iter()
    .collect()
});

/// A validated SQL identifier: `[a-z0-9_]+`, non-empty, not starting with a digit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    /// Validate an identifier that is already in safe form
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::sanitization(name, "identifier is empty"));
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(Error::sanitization(name, "identifier starts with a digit"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(Error::sanitization(
                name,
                "identifier contains characters outside [a-z0-9_]",
            ));
        }
        Ok(Self(name.to_string()))
    }

    /// The identity column
    pub fn id() -> Self {
        Self(ID_COLUMN.to_string())
    }

    /// The insertion timestamp column
    pub fn created_at() -> Self {
        Self(CREATED_AT_COLUMN.to_string())
    }

    /// Name of the sequence feeding a table's identity column
    pub fn sequence_for(table: &Ident) -> Self {
        Self(format!("{}_id_seq", table.0))
    }

    /// Raw identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL text
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Map an arbitrary source name to a safe identifier.
///
/// Never fails: names with no usable characters become `col_unknown`.
pub fn sanitize_identifier(raw: &str) -> Ident {
    let mut mapped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '%' => mapped.push_str("percent"),
            '&' => mapped.push_str("and"),
            c if c.is_ascii_alphanumeric() => mapped.push(c.to_ascii_lowercase()),
            _ => mapped.push('_'),
        }
    }

    let mut collapsed = String::with_capacity(mapped.len());
    for ch in mapped.chars() {
        if ch == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(ch);
    }

    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        return Ident(UNKNOWN_COLUMN.to_string());
    }

    if trimmed.starts_with(|c: char| c.is_ascii_digit()) || RESERVED.contains(trimmed) {
        return Ident(format!("{PREFIX}{trimmed}"));
    }

    Ident(trimmed.to_string())
}
