//! Append and upsert writer

use super::types::{RecordRejection, WriteOutcome};
use crate::database::{quote_list, TIMESTAMP_FORMAT};
use crate::error::{Error, Result};
use crate::sanitize::{Ident, SanitizedBatch, SanitizedRecord};
use crate::schema::TableDescriptor;
use chrono::Utc;
use duckdb::{params_from_iter, Connection, Transaction};
use indexmap::IndexMap;

/// Writes sanitized batches into one table
#[derive(Debug, Clone)]
pub struct RecordWriter {
    table: Ident,
    /// Key columns; empty means append
    keys: Vec<Ident>,
    /// Fill `created_at` on insert
    stamp_created_at: bool,
}

impl RecordWriter {
    /// Writer for a table as described by the registry
    pub fn new(descriptor: &TableDescriptor, keys: Vec<Ident>) -> Self {
        Self {
            table: descriptor.name.clone(),
            keys,
            stamp_created_at: descriptor.has_created_at(),
        }
    }

    /// Whether this writer upserts
    pub fn is_upsert(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Write a batch in a single transaction.
    ///
    /// Store failures roll back the whole batch. Records missing a key are
    /// rejected individually and do not fail the batch.
    pub fn write(&self, conn: &mut Connection, batch: &SanitizedBatch) -> Result<WriteOutcome> {
        if batch.is_empty() {
            return Ok(WriteOutcome::empty(self.table.as_str()));
        }

        let mut columns = batch.columns.clone();
        for key in &self.keys {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }

        let tx = conn
            .transaction()
            .map_err(|e| self.write_error(format!("Failed to begin transaction: {e}")))?;

        let outcome = if self.is_upsert() {
            self.upsert(&tx, batch, &columns)?
        } else {
            self.append(&tx, batch, &columns)?
        };

        tx.commit()
            .map_err(|e| self.write_error(format!("Failed to commit: {e}")))?;

        tracing::debug!(
            "Wrote {} of {} record(s) to '{}' ({} new)",
            outcome.rows_affected,
            outcome.records_in,
            self.table,
            outcome.rows_inserted
        );

        Ok(outcome)
    }

    fn append(
        &self,
        tx: &Transaction<'_>,
        batch: &SanitizedBatch,
        columns: &[Ident],
    ) -> Result<WriteOutcome> {
        let sql = self.insert_sql(columns, None);
        tracing::debug!("Executing insert: {}", sql);

        let mut stmt = tx
            .prepare(&sql)
            .map_err(|e| self.write_error(format!("Failed to prepare insert: {e}")))?;
        let stamp = self.timestamp();

        for record in &batch.records {
            stmt.execute(params_from_iter(row_values(record, columns, stamp.as_ref())))
                .map_err(|e| self.write_error(format!("Failed to insert row: {e}")))?;
        }

        Ok(WriteOutcome {
            table: self.table.to_string(),
            records_in: batch.len(),
            rows_inserted: batch.len(),
            rows_affected: batch.len(),
            rejected: Vec::new(),
        })
    }

    fn upsert(
        &self,
        tx: &Transaction<'_>,
        batch: &SanitizedBatch,
        columns: &[Ident],
    ) -> Result<WriteOutcome> {
        let mut rejected = Vec::new();
        // Last record per key wins; earlier duplicates count as updates
        let mut latest: IndexMap<Vec<String>, usize> = IndexMap::new();
        let mut superseded = 0usize;

        for (index, record) in batch.records.iter().enumerate() {
            match self.key_values(record) {
                Ok(key) => {
                    if latest.insert(key, index).is_some() {
                        superseded += 1;
                    }
                }
                Err(reason) => {
                    tracing::warn!(
                        "Rejected record {} for '{}': {}",
                        index,
                        self.table,
                        reason
                    );
                    rejected.push(RecordRejection { index, reason });
                }
            }
        }

        let updatable: Vec<Ident> = columns
            .iter()
            .filter(|c| !self.keys.contains(c))
            .cloned()
            .collect();
        let upsert_sql = self.insert_sql(columns, Some(&updatable));
        let exists_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            self.table.quoted(),
            self.keys
                .iter()
                .map(|k| format!("{} = ?", k.quoted()))
                .collect::<Vec<_>>()
                .join(" AND ")
        );
        tracing::debug!("Executing upsert: {}", upsert_sql);

        let mut upsert_stmt = tx
            .prepare(&upsert_sql)
            .map_err(|e| self.write_error(format!("Failed to prepare upsert: {e}")))?;
        let mut exists_stmt = tx
            .prepare(&exists_sql)
            .map_err(|e| self.write_error(format!("Failed to prepare key lookup: {e}")))?;
        let stamp = self.timestamp();

        let mut inserted = 0usize;
        for (key, index) in &latest {
            let existing: i64 = exists_stmt
                .query_row(params_from_iter(key.clone()), |row| row.get(0))
                .map_err(|e| self.write_error(format!("Failed to look up key: {e}")))?;

            let record = &batch.records[*index];
            upsert_stmt
                .execute(params_from_iter(row_values(record, columns, stamp.as_ref())))
                .map_err(|e| self.write_error(format!("Failed to upsert row: {e}")))?;

            if existing == 0 {
                inserted += 1;
            }
        }

        Ok(WriteOutcome {
            table: self.table.to_string(),
            records_in: batch.len(),
            rows_inserted: inserted,
            rows_affected: latest.len() + superseded,
            rejected,
        })
    }

    /// Key values of a record, or why it cannot be upserted
    fn key_values(&self, record: &SanitizedRecord) -> std::result::Result<Vec<String>, String> {
        self.keys
            .iter()
            .map(|key| match record.get(key) {
                Some(Some(value)) => Ok(value.clone()),
                Some(None) => Err(format!("key field '{key}' is null")),
                None => Err(format!("missing key field '{key}'")),
            })
            .collect()
    }

    /// INSERT statement; `update` turns it into an upsert
    fn insert_sql(&self, columns: &[Ident], update: Option<&[Ident]>) -> String {
        let mut names: Vec<String> = columns.iter().map(Ident::quoted).collect();
        let mut placeholders: Vec<&str> = vec!["?"; columns.len()];
        if self.stamp_created_at {
            names.push(Ident::created_at().quoted());
            placeholders.push("CAST(? AS TIMESTAMP)");
        }

        if names.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", self.table.quoted());
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.quoted(),
            names.join(", "),
            placeholders.join(", ")
        );

        if let Some(update) = update {
            let target = quote_list(&self.keys);
            if update.is_empty() {
                sql.push_str(&format!(" ON CONFLICT ({target}) DO NOTHING"));
            } else {
                let assignments = update
                    .iter()
                    .map(|c| format!("{col} = EXCLUDED.{col}", col = c.quoted()))
                    .collect::<Vec<_>>()
                    .join(", ");
                sql.push_str(&format!(
                    " ON CONFLICT ({target}) DO UPDATE SET {assignments}"
                ));
            }
        }

        sql
    }

    fn timestamp(&self) -> Option<String> {
        self.stamp_created_at
            .then(|| Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string())
    }

    fn write_error(&self, message: String) -> Error {
        Error::write(self.table.as_str(), message)
    }
}

/// Bound values for one row, in column order
fn row_values(
    record: &SanitizedRecord,
    columns: &[Ident],
    stamp: Option<&String>,
) -> Vec<Option<String>> {
    let mut values: Vec<Option<String>> = columns
        .iter()
        .map(|c| record.get(c).cloned().flatten())
        .collect();
    if let Some(stamp) = stamp {
        values.push(Some(stamp.clone()));
    }
    values
}

#[cfg(test)]
mod sql_tests {
    use super::*;
    use crate::sanitize::sanitize_identifier;

    fn descriptor(name: &str, columns: &[&str]) -> TableDescriptor {
        TableDescriptor {
            name: sanitize_identifier(name),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            unique_keys: Vec::new(),
        }
    }

    #[test]
    fn test_append_sql() {
        let writer = RecordWriter::new(&descriptor("news", &["id", "title"]), Vec::new());
        let sql = writer.insert_sql(&[sanitize_identifier("title")], None);
        assert_eq!(sql, "INSERT INTO \"news\" (\"title\") VALUES (?)");
    }

    #[test]
    fn test_upsert_sql() {
        let writer = RecordWriter::new(
            &descriptor("quotes", &["id", "symbol", "ltp", "created_at"]),
            vec![sanitize_identifier("symbol")],
        );
        let columns = [sanitize_identifier("symbol"), sanitize_identifier("ltp")];
        let sql = writer.insert_sql(&columns, Some(&columns[1..]));
        assert_eq!(
            sql,
            "INSERT INTO \"quotes\" (\"symbol\", \"ltp\", \"created_at\") \
             VALUES (?, ?, CAST(? AS TIMESTAMP)) \
             ON CONFLICT (\"symbol\") DO UPDATE SET \"ltp\" = EXCLUDED.\"ltp\""
        );
    }

    #[test]
    fn test_upsert_sql_keys_only() {
        let writer = RecordWriter::new(&descriptor("t", &["k"]), vec![sanitize_identifier("k")]);
        let columns = [sanitize_identifier("k")];
        let sql = writer.insert_sql(&columns, Some(&[]));
        assert!(sql.ends_with("ON CONFLICT (\"k\") DO NOTHING"));
    }
}
