//! Catalog introspection and DDL primitives
//!
//! Identifiers are always interpolated from [`Ident`]; values are always
//! bound parameters.

use crate::error::{Error, Result};
use crate::sanitize::{Ident, CREATED_AT_COLUMN, ID_COLUMN};
use duckdb::{params, Connection};

/// Column definitions for a table about to be created
#[derive(Debug, Clone)]
pub struct CreateTable<'a> {
    pub table: &'a Ident,
    pub columns: &'a [Ident],
    pub keys: &'a [Ident],
    pub identity: bool,
    pub created_at: bool,
}

impl CreateTable<'_> {
    /// Render the CREATE TABLE statement
    pub fn to_sql(&self) -> String {
        let mut defs: Vec<String> = Vec::with_capacity(self.columns.len() + 3);

        if self.identity {
            defs.push(format!(
                "{} BIGINT DEFAULT nextval('{}')",
                Ident::id().quoted(),
                Ident::sequence_for(self.table)
            ));
        }
        for column in self.columns {
            defs.push(format!("{} VARCHAR", column.quoted()));
        }
        if self.created_at {
            defs.push(format!("{} TIMESTAMP", Ident::created_at().quoted()));
        }
        if !self.keys.is_empty() {
            defs.push(format!("UNIQUE ({})", quote_list(self.keys)));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table.quoted(),
            defs.join(", ")
        )
    }
}

/// Join identifiers as a quoted, comma separated list
pub fn quote_list(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(Ident::quoted)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote a name read back from the catalog
pub(crate) fn quote_raw(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Whether a DDL failure is the benign result of a concurrent writer
/// creating the same table or column first.
pub fn is_benign_ddl_conflict(err: &duckdb::Error) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("already exists") || message.contains("conflict")
}

/// Check whether a table exists in the main schema
pub fn table_exists(conn: &Connection, table: &Ident) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_catalog = current_database()
               AND table_schema = 'main'
               AND table_name = ?",
            params![table.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| Error::schema(table.as_str(), format!("Failed to inspect table: {e}")))?;
    Ok(count > 0)
}

/// Column names of a table, in ordinal order
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT column_name FROM information_schema.columns
             WHERE table_catalog = current_database()
               AND table_schema = 'main'
               AND table_name = ?
             ORDER BY ordinal_position",
        )
        .map_err(|e| Error::schema(table, format!("Failed to prepare query: {e}")))?;

    let columns = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))
        .map_err(|e| Error::schema(table, format!("Failed to query columns: {e}")))?
        .collect::<duckdb::Result<Vec<_>>>()
        .map_err(|e| Error::schema(table, format!("Failed to read columns: {e}")))?;

    Ok(columns.into_iter().map(|c| c.to_lowercase()).collect())
}

/// Column sets of every UNIQUE or PRIMARY KEY constraint on a table
pub fn unique_constraints(conn: &Connection, table: &str) -> Result<Vec<Vec<String>>> {
    let mut stmt = conn
        .prepare(
            "SELECT array_to_string(constraint_column_names, ',')
             FROM duckdb_constraints()
             WHERE database_name = current_database()
               AND schema_name = 'main'
               AND table_name = ?
               AND constraint_type IN ('UNIQUE', 'PRIMARY KEY')",
        )
        .map_err(|e| Error::schema(table, format!("Failed to prepare query: {e}")))?;

    let rows = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))
        .map_err(|e| Error::schema(table, format!("Failed to query constraints: {e}")))?
        .collect::<duckdb::Result<Vec<_>>>()
        .map_err(|e| Error::schema(table, format!("Failed to read constraints: {e}")))?;

    Ok(rows
        .into_iter()
        .map(|joined| {
            joined
                .split(',')
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .collect())
}

/// All base tables in the main schema
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT table_name FROM information_schema.tables
             WHERE table_catalog = current_database()
               AND table_schema = 'main'
               AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .map_err(|e| Error::schema("*", format!("Failed to prepare query: {e}")))?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| Error::schema("*", format!("Failed to query tables: {e}")))?
        .collect::<duckdb::Result<Vec<_>>>()
        .map_err(|e| Error::schema("*", format!("Failed to read tables: {e}")))?;

    Ok(tables)
}

/// Create a table (and its identity sequence). Raw store error on failure.
pub fn create_table(conn: &Connection, def: &CreateTable<'_>) -> duckdb::Result<()> {
    if def.identity {
        let sql = format!(
            "CREATE SEQUENCE IF NOT EXISTS {}",
            Ident::sequence_for(def.table).quoted()
        );
        tracing::debug!("Executing DDL: {}", sql);
        conn.execute_batch(&sql)?;
    }

    let sql = def.to_sql();
    tracing::debug!("Executing DDL: {}", sql);
    conn.execute_batch(&sql)
}

/// Add a nullable text column. Raw store error on failure.
pub fn add_column(conn: &Connection, table: &Ident, column: &Ident) -> duckdb::Result<()> {
    let sql = format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} VARCHAR",
        table.quoted(),
        column.quoted()
    );
    tracing::debug!("Executing DDL: {}", sql);
    conn.execute_batch(&sql)
}

/// Whether a column name is one of the system columns
pub fn is_system_column(name: &str) -> bool {
    name == ID_COLUMN || name == CREATED_AT_COLUMN
}
