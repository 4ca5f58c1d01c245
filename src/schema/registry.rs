//! Schema registry: ensure tables and columns exist before a write

use super::types::{EnsureReport, TableDescriptor, TableSpec};
use crate::database::{
    add_column, create_table, is_benign_ddl_conflict, quote_list, table_columns, table_exists,
    unique_constraints, CreateTable,
};
use crate::error::{Error, Result};
use crate::sanitize::Ident;
use duckdb::Connection;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Attempts before a racing schema change is reported as a failure
pub const MAX_DDL_ATTEMPTS: u32 = 5;

const RETRY_PAUSE: Duration = Duration::from_millis(25);

/// Outcome of one ensure attempt
enum Attempt {
    /// Another writer is mid-change; introspect again
    Pending(String),
    Failed(Error),
}

impl From<Error> for Attempt {
    fn from(err: Error) -> Self {
        Attempt::Failed(err)
    }
}

/// Process-wide advisory cache of table shapes for one database
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    cache: RwLock<HashMap<Ident, TableDescriptor>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known shape of a table, if cached
    pub fn cached(&self, table: &Ident) -> Option<TableDescriptor> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(table).cloned())
    }

    /// Forget a table so the next ensure introspects the store
    pub fn invalidate(&self, table: &Ident) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(table);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    fn remember(&self, descriptor: &TableDescriptor) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(descriptor.name.clone(), descriptor.clone());
        }
    }

    /// Introspect a table and refresh the cache. `None` if it does not exist.
    pub fn describe(&self, conn: &Connection, table: &Ident) -> Result<Option<TableDescriptor>> {
        let columns = table_columns(conn, table.as_str())?;
        if columns.is_empty() {
            self.invalidate(table);
            return Ok(None);
        }

        let descriptor = TableDescriptor {
            name: table.clone(),
            columns,
            unique_keys: unique_constraints(conn, table.as_str())?,
        };
        self.remember(&descriptor);
        Ok(Some(descriptor))
    }

    /// Create the table if it is missing.
    ///
    /// Returns `true` when this call issued the CREATE. A concurrent create
    /// that wins the race is not an error.
    pub fn ensure_table(&self, conn: &Connection, spec: &TableSpec, columns: &[Ident]) -> Result<bool> {
        if table_exists(conn, &spec.name)? {
            return Ok(false);
        }

        if columns.is_empty() && !spec.options.identity && !spec.options.created_at {
            return Err(Error::schema(
                spec.name.as_str(),
                "cannot create a table without columns",
            ));
        }

        let def = CreateTable {
            table: &spec.name,
            columns,
            keys: &spec.keys,
            identity: spec.options.identity,
            created_at: spec.options.created_at,
        };

        match create_table(conn, &def) {
            Ok(()) => {
                tracing::info!(
                    "Created table '{}' with {} column(s)",
                    spec.name,
                    columns.len()
                );
                self.invalidate(&spec.name);
                Ok(true)
            }
            Err(e) if is_benign_ddl_conflict(&e) => {
                tracing::warn!("Table '{}' created concurrently: {}", spec.name, e);
                Ok(false)
            }
            Err(e) => Err(Error::schema(
                spec.name.as_str(),
                format!("Failed to create table: {e}"),
            )),
        }
    }

    /// Add a nullable text column if it is missing.
    ///
    /// Returns `false` when the column turned out to exist already.
    pub fn ensure_column(&self, conn: &Connection, table: &Ident, column: &Ident) -> Result<bool> {
        match add_column(conn, table, column) {
            Ok(()) => Ok(true),
            Err(e) if is_benign_ddl_conflict(&e) => {
                tracing::warn!("Column '{}.{}' added concurrently: {}", table, column, e);
                Ok(false)
            }
            Err(e) => Err(Error::schema(
                table.as_str(),
                format!("Failed to add column '{column}': {e}"),
            )),
        }
    }

    /// Ensure `spec.name` exists with every column in `columns`.
    ///
    /// On success every given column (and every key column) exists in the
    /// table. Racing writers are tolerated by re-introspecting, up to
    /// [`MAX_DDL_ATTEMPTS`] times.
    pub fn ensure(&self, conn: &Connection, spec: &TableSpec, columns: &[Ident]) -> Result<EnsureReport> {
        let mut wanted: Vec<Ident> = columns.to_vec();
        for key in &spec.keys {
            if !wanted.contains(key) {
                wanted.push(key.clone());
            }
        }

        if let Some(descriptor) = self.cached(&spec.name) {
            if descriptor.has_columns(&wanted) && descriptor.has_unique_key(&spec.keys) {
                return Ok(EnsureReport {
                    descriptor,
                    existed: true,
                    added_columns: Vec::new(),
                });
            }
        }

        let mut last_reason = String::new();
        for attempt in 1..=MAX_DDL_ATTEMPTS {
            match self.try_ensure(conn, spec, &wanted) {
                Ok(report) => return Ok(report),
                Err(Attempt::Failed(e)) => {
                    self.invalidate(&spec.name);
                    return Err(e);
                }
                Err(Attempt::Pending(reason)) => {
                    tracing::warn!(
                        "Schema for '{}' not settled, attempt {}/{}: {}",
                        spec.name,
                        attempt,
                        MAX_DDL_ATTEMPTS,
                        reason
                    );
                    self.invalidate(&spec.name);
                    last_reason = reason;
                    std::thread::sleep(RETRY_PAUSE * attempt);
                }
            }
        }

        Err(Error::schema(
            spec.name.as_str(),
            format!("schema did not settle after {MAX_DDL_ATTEMPTS} attempts: {last_reason}"),
        ))
    }

    fn try_ensure(
        &self,
        conn: &Connection,
        spec: &TableSpec,
        wanted: &[Ident],
    ) -> std::result::Result<EnsureReport, Attempt> {
        let existed = table_exists(conn, &spec.name)?;
        if !existed {
            self.ensure_table(conn, spec, wanted)?;
        }

        let Some(descriptor) = self.describe(conn, &spec.name)? else {
            return Err(Attempt::Pending("table not visible yet".to_string()));
        };

        if existed {
            if spec.options.identity && !descriptor.has_identity() {
                tracing::debug!("Table '{}' predates identity column, skipping", spec.name);
            }
            if spec.options.created_at && !descriptor.has_created_at() {
                tracing::debug!("Table '{}' predates created_at column, skipping", spec.name);
            }
        }

        if !descriptor.has_unique_key(&spec.keys) {
            return Err(Attempt::Failed(Error::schema(
                spec.name.as_str(),
                format!(
                    "table has no unique constraint over ({})",
                    quote_list(&spec.keys)
                ),
            )));
        }

        let missing: Vec<&Ident> = wanted
            .iter()
            .filter(|c| !descriptor.has_column(c.as_str()))
            .collect();
        if missing.is_empty() {
            return Ok(EnsureReport {
                descriptor,
                existed,
                added_columns: Vec::new(),
            });
        }

        let mut added = Vec::with_capacity(missing.len());
        for column in missing {
            if self.ensure_column(conn, &spec.name, column)? {
                added.push(column.clone());
            }
        }

        let Some(descriptor) = self.describe(conn, &spec.name)? else {
            return Err(Attempt::Pending("table vanished while adding columns".to_string()));
        };
        if !descriptor.has_columns(wanted) {
            return Err(Attempt::Pending("added columns not visible yet".to_string()));
        }

        if !added.is_empty() {
            tracing::info!(
                "Added {} column(s) to '{}': {}",
                added.len(),
                spec.name,
                added
                    .iter()
                    .map(Ident::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(EnsureReport {
            descriptor,
            existed,
            added_columns: added,
        })
    }
}
