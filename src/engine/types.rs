//! Engine types
//!
//! Units of work, batches and per-unit results.

use crate::error::{Error, ErrorKind, Result};
use crate::output::WriteOutcome;
use crate::types::{Record, TableOptions, WriteMode};
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Records bound for one table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    /// Destination table, sanitized before use
    pub table: String,
    pub mode: WriteMode,
    pub options: TableOptions,
    pub records: Vec<Record>,
}

impl Batch {
    /// Append-only batch
    pub fn append(table: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            table: table.into(),
            mode: WriteMode::Append,
            options: TableOptions::default(),
            records,
        }
    }

    /// Upsert batch keyed by the given source fields
    pub fn upsert<I, S>(table: impl Into<String>, keys: I, records: Vec<Record>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            mode: WriteMode::upsert(keys),
            options: TableOptions::default(),
            records,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Produces the batches for one unit of work
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Batch>>;
}

/// Fetcher backed by an async closure
pub struct FnFetcher<F>(F);

#[async_trait]
impl<F, Fut> Fetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Batch>>> + Send,
{
    async fn fetch(&self) -> Result<Vec<Batch>> {
        (self.0)().await
    }
}

/// Fetcher that hands out batches it already holds
pub struct StaticFetcher(Vec<Batch>);

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        Ok(self.0.clone())
    }
}

/// A named fetch-and-persist job for one database
#[derive(Clone)]
pub struct Unit {
    pub name: String,
    /// Domain database the batches go to
    pub database: String,
    /// Declared destination, reported when the fetch fails
    pub table: String,
    pub fetcher: Arc<dyn Fetcher>,
}

impl Unit {
    pub fn new(
        name: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            table: table.into(),
            fetcher,
        }
    }

    /// Unit from an async closure
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Batch>>> + Send + 'static,
    {
        Self::new(name, database, table, Arc::new(FnFetcher(f)))
    }

    /// Unit that writes a batch already in hand
    pub fn from_batch(name: impl Into<String>, database: impl Into<String>, batch: Batch) -> Self {
        let table = batch.table.clone();
        Self::new(name, database, table, Arc::new(StaticFetcher(vec![batch])))
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("database", &self.database)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Configuration for the ingest engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Units processed concurrently
    pub max_workers: usize,
    /// Upper bound on a unit's fetch
    pub fetch_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            fetch_timeout: Duration::from_secs(120),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Outcome of one batch within a unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    #[serde(flatten)]
    pub outcome: WriteOutcome,
    /// The table was created by this batch
    pub created_table: bool,
    pub added_columns: Vec<String>,
}

/// Status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Success,
    Error,
}

/// Result of running one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitResult {
    pub unit: String,
    pub database: String,
    pub status: UnitStatus,
    /// Tables written, comma separated; the declared table when nothing was
    pub table: String,
    pub records_in: usize,
    pub rows_affected: usize,
    pub rows_inserted: usize,
    pub records_rejected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub batches: Vec<BatchResult>,
    pub duration_ms: u64,
}

impl UnitResult {
    /// Build from the batches written and an optional failure
    pub(crate) fn new(
        unit: &Unit,
        batches: Vec<BatchResult>,
        error: Option<&Error>,
        duration: Duration,
    ) -> Self {
        let mut tables: Vec<&str> = Vec::new();
        for batch in &batches {
            if !tables.contains(&batch.outcome.table.as_str()) {
                tables.push(&batch.outcome.table);
            }
        }
        let table = if tables.is_empty() {
            unit.table.clone()
        } else {
            tables.join(",")
        };

        Self {
            unit: unit.name.clone(),
            database: unit.database.clone(),
            status: if error.is_some() {
                UnitStatus::Error
            } else {
                UnitStatus::Success
            },
            table,
            records_in: batches.iter().map(|b| b.outcome.records_in).sum(),
            rows_affected: batches.iter().map(|b| b.outcome.rows_affected).sum(),
            rows_inserted: batches.iter().map(|b| b.outcome.rows_inserted).sum(),
            records_rejected: batches.iter().map(|b| b.outcome.rejected.len()).sum(),
            error_message: error.map(ToString::to_string),
            error_kind: error.map(Error::kind),
            batches,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UnitStatus::Success
    }
}

/// Results of a run over many units
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub records_in: usize,
    pub rows_affected: usize,
    pub duration_ms: u64,
    /// Per-unit results in completion order
    pub units: Vec<UnitResult>,
}

impl RunSummary {
    pub fn from_results(units: Vec<UnitResult>, duration: Duration) -> Self {
        Self {
            succeeded: units.iter().filter(|u| u.is_success()).count(),
            failed: units.iter().filter(|u| !u.is_success()).count(),
            records_in: units.iter().map(|u| u.records_in).sum(),
            rows_affected: units.iter().map(|u| u.rows_affected).sum(),
            duration_ms: duration.as_millis() as u64,
            units,
        }
    }

    /// Result for a unit by name
    pub fn unit(&self, name: &str) -> Option<&UnitResult> {
        self.units.iter().find(|u| u.unit == name)
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
