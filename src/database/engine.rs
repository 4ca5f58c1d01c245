//! DuckDB-backed store for one logical domain
//!
//! Each domain (bhavcopy, indices, news, ...) lives in its own database.
//! Units of work never share a connection: [`DatabaseEngine::connect`] hands
//! out a fresh connection to the same database for every unit.

use super::catalog::{self, quote_raw};
use crate::error::{Error, Result};
use crate::schema::SchemaRegistry;
use crate::types::{JsonObject, JsonValue};
use chrono::{NaiveDateTime, Utc};
use duckdb::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Timestamp format used for `created_at` values
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Summary of a table for introspection endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<String>,
    /// Columns other than `id` and `created_at`
    pub data_columns: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
    pub row_count: u64,
}

/// Database engine for one domain
pub struct DatabaseEngine {
    /// Logical domain name
    name: String,
    /// File path or `:memory:`
    location: String,
    /// Root connection; units clone from it
    conn: Mutex<Connection>,
    /// Advisory schema cache for this database
    registry: SchemaRegistry,
    /// Per-table write locks, held from schema ensure through commit
    table_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DatabaseEngine {
    /// Open (or create) a database file
    pub fn open(name: impl Into<String>, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let name = name.into();
        let conn = Connection::open(path).map_err(|e| {
            Error::schema(
                "*",
                format!("Failed to open database '{name}' at {}: {e}", path.display()),
            )
        })?;

        tracing::debug!("Opened database '{}' at {}", name, path.display());

        Ok(Self {
            name,
            location: path.display().to_string(),
            conn: Mutex::new(conn),
            registry: SchemaRegistry::new(),
            table_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Create an in-memory database
    pub fn in_memory(name: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::schema("*", format!("Failed to create DuckDB connection: {e}")))?;

        Ok(Self {
            name: name.into(),
            location: ":memory:".to_string(),
            conn: Mutex::new(conn),
            registry: SchemaRegistry::new(),
            table_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Domain name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File path or `:memory:`
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Schema registry for this database
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Open a new connection scoped to the caller
    pub fn connect(&self) -> Result<Connection> {
        let root = self
            .conn
            .lock()
            .map_err(|_| Error::Other(format!("Connection lock poisoned for '{}'", self.name)))?;
        root.try_clone()
            .map_err(|e| Error::schema("*", format!("Store unavailable for '{}': {e}", self.name)))
    }

    /// Run `f` while holding the write lock for `table`.
    ///
    /// DuckDB aborts an open insert when another transaction alters the same
    /// table, so ensure-then-write must not interleave with a column add.
    pub fn with_table_lock<T>(&self, table: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self
                .table_locks
                .lock()
                .map_err(|_| Error::Other(format!("Table lock map poisoned for '{}'", self.name)))?;
            Arc::clone(locks.entry(table.to_string()).or_default())
        };

        let _guard = lock
            .lock()
            .map_err(|_| Error::Other(format!("Write lock poisoned for table '{table}'")))?;
        f()
    }

    /// Test database connection
    pub fn check_connection(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch("SELECT 1")
            .map_err(|e| Error::schema("*", format!("Connection check failed: {e}")))
    }

    /// Get list of tables in the database
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        catalog::list_tables(&conn)
    }

    /// Describe a table, `None` when it does not exist
    pub fn describe_table(&self, table: &str) -> Result<Option<TableInfo>> {
        let conn = self.connect()?;
        let columns = catalog::table_columns(&conn, table)?;
        if columns.is_empty() {
            return Ok(None);
        }

        let data_columns = columns
            .iter()
            .filter(|c| !catalog::is_system_column(c))
            .cloned()
            .collect();
        let unique_keys = catalog::unique_constraints(&conn, table)?;
        let row_count = count_rows(&conn, table)?;

        Ok(Some(TableInfo {
            name: table.to_string(),
            columns,
            data_columns,
            unique_keys,
            row_count,
        }))
    }

    /// Number of rows in a table
    pub fn row_count(&self, table: &str) -> Result<u64> {
        let conn = self.connect()?;
        count_rows(&conn, table)
    }

    /// Read up to `limit` rows as JSON objects
    pub fn preview(&self, table: &str, limit: usize) -> Result<Vec<JsonObject>> {
        let conn = self.connect()?;
        let columns = catalog::table_columns(&conn, table)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let select_list = columns
            .iter()
            .map(|c| quote_raw(c))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!("SELECT {select_list} FROM {} LIMIT ?", quote_raw(table));

        tracing::debug!("Executing query: {}", query);

        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| Error::schema(table, format!("Failed to prepare query: {e}")))?;

        let width = columns.len();
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                (0..width)
                    .map(|i| row.get::<_, duckdb::types::Value>(i))
                    .collect::<duckdb::Result<Vec<_>>>()
            })
            .map_err(|e| Error::schema(table, format!("Failed to query rows: {e}")))?
            .collect::<duckdb::Result<Vec<_>>>()
            .map_err(|e| Error::schema(table, format!("Failed to read rows: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values.into_iter().map(duckdb_value_to_json))
                    .collect()
            })
            .collect())
    }

    /// Delete rows whose `created_at` is older than `cutoff`
    pub fn prune_before(&self, table: &str, cutoff: NaiveDateTime) -> Result<usize> {
        let conn = self.connect()?;
        let columns = catalog::table_columns(&conn, table)?;
        if !columns
            .iter()
            .any(|c| c == crate::sanitize::CREATED_AT_COLUMN)
        {
            tracing::debug!("Table '{}' has no created_at column, nothing to prune", table);
            return Ok(0);
        }

        let sql = format!(
            "DELETE FROM {} WHERE \"created_at\" < CAST(? AS TIMESTAMP)",
            quote_raw(table)
        );
        let deleted = conn
            .execute(&sql, params![cutoff.format(TIMESTAMP_FORMAT).to_string()])
            .map_err(|e| Error::write(table, format!("Failed to prune rows: {e}")))?;

        tracing::info!(
            "Pruned {} rows older than {} from '{}.{}'",
            deleted,
            cutoff,
            self.name,
            table
        );
        Ok(deleted)
    }

    /// Delete rows inserted more than `days` days ago
    pub fn prune_older_than(&self, table: &str, days: i64) -> Result<usize> {
        let cutoff = Utc::now().naive_utc() - chrono::Duration::days(days);
        self.prune_before(table, cutoff)
    }
}

impl std::fmt::Debug for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseEngine")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_raw(table));
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(|e| Error::schema(table, format!("Failed to count rows: {e}")))?;
    Ok(count as u64)
}

/// Convert DuckDB Value to JSON Value
fn duckdb_value_to_json(value: duckdb::types::Value) -> JsonValue {
    use duckdb::types::Value;

    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::TinyInt(i) => JsonValue::from(i),
        Value::SmallInt(i) => JsonValue::from(i),
        Value::Int(i) => JsonValue::from(i),
        Value::BigInt(i) => JsonValue::from(i),
        Value::HugeInt(i) => JsonValue::String(i.to_string()),
        Value::UTinyInt(i) => JsonValue::from(i),
        Value::USmallInt(i) => JsonValue::from(i),
        Value::UInt(i) => JsonValue::from(i),
        Value::UBigInt(i) => JsonValue::from(i),
        Value::Double(f) => {
            serde_json::Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
        }
        Value::Text(s) => JsonValue::String(s),
        Value::Timestamp(_, i) => {
            let secs = i.div_euclid(1_000_000);
            let nsecs = (i.rem_euclid(1_000_000) * 1000) as u32;
            chrono::DateTime::from_timestamp(secs, nsecs)
                .map(|dt| JsonValue::String(dt.naive_utc().format(TIMESTAMP_FORMAT).to_string()))
                .unwrap_or(JsonValue::from(i))
        }
        other => JsonValue::String(format!("{other:?}")),
    }
}
