//! Schema registry types

use crate::sanitize::{Ident, CREATED_AT_COLUMN, ID_COLUMN};
use crate::types::TableOptions;
use serde::Serialize;

/// What a caller wants a destination table to look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: Ident,
    /// Key columns defining uniqueness; empty for append-only tables
    pub keys: Vec<Ident>,
    pub options: TableOptions,
}

impl TableSpec {
    pub fn new(name: Ident) -> Self {
        Self {
            name,
            keys: Vec::new(),
            options: TableOptions::default(),
        }
    }

    #[must_use]
    pub fn with_keys(mut self, keys: Vec<Ident>) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }
}

/// Known shape of a table as last seen in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub name: Ident,
    /// Canonical lower-case column names in ordinal order
    pub columns: Vec<String>,
    /// Column sets of every UNIQUE / PRIMARY KEY constraint
    pub unique_keys: Vec<Vec<String>>,
}

impl TableDescriptor {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Whether every given column exists
    pub fn has_columns(&self, columns: &[Ident]) -> bool {
        columns.iter().all(|c| self.has_column(c.as_str()))
    }

    /// Whether a UNIQUE constraint covers exactly these columns
    pub fn has_unique_key(&self, keys: &[Ident]) -> bool {
        if keys.is_empty() {
            return true;
        }
        let mut wanted: Vec<&str> = keys.iter().map(Ident::as_str).collect();
        wanted.sort_unstable();
        wanted.dedup();

        self.unique_keys.iter().any(|constraint| {
            let mut have: Vec<&str> = constraint.iter().map(String::as_str).collect();
            have.sort_unstable();
            have.dedup();
            have == wanted
        })
    }

    pub fn has_identity(&self) -> bool {
        self.has_column(ID_COLUMN)
    }

    pub fn has_created_at(&self) -> bool {
        self.has_column(CREATED_AT_COLUMN)
    }
}

/// Result of ensuring a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsureReport {
    pub descriptor: TableDescriptor,
    /// The table existed before this call
    pub existed: bool,
    /// Columns this call added
    pub added_columns: Vec<Ident>,
}
