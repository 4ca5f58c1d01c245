//! Relational store via DuckDB
//!
//! One embedded DuckDB database per logical domain. This module owns
//! connections, catalog introspection and the raw DDL statements; deciding
//! *when* to run DDL is the schema registry's job.

mod catalog;
mod engine;
mod set;

pub use catalog::{
    add_column, create_table, is_benign_ddl_conflict, is_system_column, list_tables, quote_list,
    table_columns, table_exists, unique_constraints, CreateTable,
};
pub use engine::{DatabaseEngine, TableInfo, TIMESTAMP_FORMAT};
pub use set::{DatabaseSet, IN_MEMORY};

#[cfg(test)]
mod tests;
