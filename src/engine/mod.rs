//! Ingest engine
//!
//! Runs units of work on a bounded worker pool.
//!
//! # Overview
//!
//! The engine module provides:
//! - `IngestEngine` - Fetches and persists units concurrently
//! - `Unit` / `Fetcher` - A named fetch producing batches for one database
//! - `UnitResult` / `RunSummary` - Per-unit and aggregate outcomes
//!
//! A failing unit never affects its siblings: fetch errors, timeouts, store
//! errors and panics all end up as an `error` result for that unit alone.

mod types;

pub use types::{
    Batch, BatchResult, EngineConfig, Fetcher, FnFetcher, RunSummary, StaticFetcher, Unit,
    UnitResult, UnitStatus,
};

use crate::database::{DatabaseEngine, DatabaseSet};
use crate::error::{Error, Result};
use crate::output::{RecordWriter, WriteOutcome};
use crate::sanitize::{sanitize_batch, sanitize_identifier, Ident};
use crate::schema::TableSpec;
use crate::types::WriteMode;
use duckdb::Connection;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Concurrent fetch-and-persist engine
pub struct IngestEngine {
    databases: Arc<DatabaseSet>,
    config: EngineConfig,
}

impl IngestEngine {
    /// Create an engine over a set of databases
    pub fn new(databases: Arc<DatabaseSet>) -> Self {
        Self {
            databases,
            config: EngineConfig::default(),
        }
    }

    /// Set engine configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn databases(&self) -> &Arc<DatabaseSet> {
        &self.databases
    }

    /// Run units with at most `max_workers` in flight.
    ///
    /// Returns one result per unit, in completion order.
    pub async fn run(&self, units: Vec<Unit>) -> RunSummary {
        let start = Instant::now();
        let total = units.len();
        tracing::info!(
            "Running {} unit(s) with {} worker(s)",
            total,
            self.config.max_workers
        );

        let results: Vec<UnitResult> = stream::iter(units)
            .map(|unit| self.run_unit(unit))
            .buffer_unordered(self.config.max_workers.max(1))
            .collect()
            .await;

        let summary = RunSummary::from_results(results, start.elapsed());
        tracing::info!(
            "Run complete: {} succeeded, {} failed, {} row(s) affected in {}ms",
            summary.succeeded,
            summary.failed,
            summary.rows_affected,
            summary.duration_ms
        );
        summary
    }

    /// Fetch and persist a single unit
    pub async fn run_unit(&self, unit: Unit) -> UnitResult {
        let start = Instant::now();
        tracing::info!("Starting unit '{}' -> {}", unit.name, unit.database);

        let fetcher = Arc::clone(&unit.fetcher);
        let mut task = tokio::spawn(async move { fetcher.fetch().await });

        let fetched = match tokio::time::timeout(self.config.fetch_timeout, &mut task).await {
            Ok(Ok(Ok(batches))) => batches,
            Ok(Ok(Err(e))) => return finish(&unit, Vec::new(), Some(e), start),
            Ok(Err(join_err)) => {
                let err = Error::fetch(&unit.name, format!("fetch task failed: {join_err}"));
                return finish(&unit, Vec::new(), Some(err), start);
            }
            Err(_) => {
                task.abort();
                let err = Error::Timeout {
                    timeout_ms: self.config.fetch_timeout.as_millis() as u64,
                };
                return finish(&unit, Vec::new(), Some(err), start);
            }
        };

        let databases = Arc::clone(&self.databases);
        let database = unit.database.clone();
        let persisted =
            tokio::task::spawn_blocking(move || persist_batches(&databases, &database, fetched))
                .await;

        match persisted {
            Ok((batches, error)) => finish(&unit, batches, error, start),
            Err(join_err) => {
                let err = Error::Other(format!("Worker for unit '{}' failed: {join_err}", unit.name));
                finish(&unit, Vec::new(), Some(err), start)
            }
        }
    }
}

impl std::fmt::Debug for IngestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestEngine")
            .field("databases", &self.databases)
            .field("config", &self.config)
            .finish()
    }
}

fn finish(unit: &Unit, batches: Vec<BatchResult>, error: Option<Error>, start: Instant) -> UnitResult {
    let result = UnitResult::new(unit, batches, error.as_ref(), start.elapsed());
    match &error {
        None => tracing::info!(
            "Unit '{}' stored {} of {} record(s) in '{}' ({}ms)",
            unit.name,
            result.rows_affected,
            result.records_in,
            result.table,
            result.duration_ms
        ),
        Some(e) => tracing::error!("Unit '{}' failed: {}", unit.name, e),
    }
    result
}

/// Persist batches in order on a connection of their own.
///
/// Stops at the first failing batch; batches already committed stay.
fn persist_batches(
    databases: &DatabaseSet,
    database: &str,
    batches: Vec<Batch>,
) -> (Vec<BatchResult>, Option<Error>) {
    let mut results = Vec::with_capacity(batches.len());

    let (engine, mut conn) = match open(databases, database) {
        Ok(pair) => pair,
        Err(e) => return (results, Some(e)),
    };

    for batch in &batches {
        match store_batch(&engine, &mut conn, batch) {
            Ok(result) => results.push(result),
            Err(e) => return (results, Some(e)),
        }
    }

    (results, None)
}

fn open(databases: &DatabaseSet, database: &str) -> Result<(Arc<DatabaseEngine>, Connection)> {
    let engine = databases.get(database)?;
    let conn = engine.connect()?;
    Ok((engine, conn))
}

/// Sanitize, ensure schema and write one batch.
///
/// An empty batch is a no-op that creates nothing.
pub fn store_batch(
    engine: &DatabaseEngine,
    conn: &mut Connection,
    batch: &Batch,
) -> Result<BatchResult> {
    let table = sanitize_identifier(&batch.table);
    let sanitized = sanitize_batch(&batch.records);

    if sanitized.is_empty() {
        tracing::debug!("No records for '{}', skipping", table);
        return Ok(BatchResult {
            outcome: WriteOutcome::empty(table.as_str()),
            created_table: false,
            added_columns: Vec::new(),
        });
    }

    let keys = key_columns(&table, &batch.mode)?;
    let spec = TableSpec::new(table)
        .with_keys(keys.clone())
        .with_options(batch.options);

    let (report, outcome) = engine.with_table_lock(spec.name.as_str(), || {
        let report = engine.registry().ensure(conn, &spec, &sanitized.columns)?;
        let outcome = RecordWriter::new(&report.descriptor, keys)
            .write(conn, &sanitized)
            .inspect_err(|_| engine.registry().invalidate(&spec.name))?;
        Ok((report, outcome))
    })?;

    Ok(BatchResult {
        outcome,
        created_table: !report.existed,
        added_columns: report.added_columns.iter().map(ToString::to_string).collect(),
    })
}

/// Sanitized, de-duplicated key columns; empty for append
fn key_columns(table: &Ident, mode: &WriteMode) -> Result<Vec<Ident>> {
    let WriteMode::Upsert { keys } = mode else {
        return Ok(Vec::new());
    };
    if keys.is_empty() {
        return Err(Error::write(table.as_str(), "upsert requires at least one key"));
    }

    let mut columns: Vec<Ident> = Vec::with_capacity(keys.len());
    for key in keys {
        let column = sanitize_identifier(key);
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    Ok(columns)
}

#[cfg(test)]
mod tests;
