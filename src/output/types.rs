//! Writer result types

use serde::Serialize;

/// A record the writer refused, with its position in the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRejection {
    pub index: usize,
    pub reason: String,
}

/// Result of writing one batch to one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub table: String,
    /// Records handed to the writer
    pub records_in: usize,
    /// Rows that did not exist before this write
    pub rows_inserted: usize,
    /// Rows inserted plus rows updated
    pub rows_affected: usize,
    pub rejected: Vec<RecordRejection>,
}

impl WriteOutcome {
    /// Outcome of a batch with nothing to write
    pub fn empty(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Rows updated in place (upsert only)
    pub fn rows_updated(&self) -> usize {
        self.rows_affected - self.rows_inserted
    }
}
