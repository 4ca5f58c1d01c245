//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseSet;
use crate::engine::{Batch, IngestEngine, RunSummary, Unit};
use crate::error::{Error, Result};
use crate::jobs::{list_jobs, JobRunner};
use crate::sources::SourceContext;
use crate::types::{Record, TableOptions, WriteMode};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Wire the store, engine and sources from configuration
pub fn build_job_runner(config: &AppConfig) -> Result<Arc<JobRunner>> {
    let databases = Arc::new(DatabaseSet::from_config(&config.store));
    let engine = IngestEngine::new(databases).with_config(config.engine.to_engine_config());
    let sources = SourceContext::new(&config.http, config.sources.clone())?;

    Ok(Arc::new(JobRunner::new(
        Arc::new(engine),
        sources,
        config.scheduler.tz()?,
    )))
}

/// Parse a JSON document into records: an array of objects or one object
pub fn records_from_json(text: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Array(rows) => Ok(Record::from_json_rows(rows)),
        Value::Object(_) => Ok(vec![Record::from_json(value)]),
        other => Err(Error::decode(format!(
            "expected an array of objects, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = AppConfig::load(self.cli.config.as_deref())?;

        match &self.cli.command {
            Commands::Run { job, date } => self.run_job(&config, job, *date).await,
            Commands::Backfill { from, to } => self.backfill(&config, *from, *to).await,
            Commands::Ingest {
                database,
                table,
                keys,
                file,
                timestamped,
            } => {
                self.ingest(
                    &config,
                    database,
                    table,
                    keys,
                    file.as_deref(),
                    *timestamped,
                )
                .await
            }
            Commands::Tables {
                database,
                table,
                limit,
            } => self.tables(&config, database, table.as_deref(), *limit),
            Commands::Jobs => {
                self.output(&json!({ "jobs": list_jobs() }));
                Ok(())
            }
            Commands::Serve { port } => {
                let mut server = config.server.clone();
                if let Some(port) = port {
                    server.port = *port;
                }
                let jobs = build_job_runner(&config)?;
                crate::cli::serve(jobs, &config.scheduler, &server).await
            }
        }
    }

    async fn run_job(&self, config: &AppConfig, job: &str, date: Option<NaiveDate>) -> Result<()> {
        let jobs = build_job_runner(config)?;
        let summary = match date {
            Some(date) => jobs.run_for(job, date).await?,
            None => jobs.run(job).await?,
        };
        self.finish(&summary)
    }

    async fn backfill(&self, config: &AppConfig, from: NaiveDate, to: NaiveDate) -> Result<()> {
        let jobs = build_job_runner(config)?;
        let summary = jobs.backfill(from, to).await?;
        self.finish(&summary)
    }

    async fn ingest(
        &self,
        config: &AppConfig,
        database: &str,
        table: &str,
        keys: &[String],
        file: Option<&Path>,
        timestamped: bool,
    ) -> Result<()> {
        let text = match file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                Error::config(format!("Failed to read {}: {e}", path.display()))
            })?,
            None => std::io::read_to_string(std::io::stdin())?,
        };
        let records = records_from_json(&text)?;

        let mode = if keys.is_empty() {
            WriteMode::Append
        } else {
            WriteMode::upsert(keys.iter().cloned())
        };
        let options = if timestamped {
            TableOptions::timestamped()
        } else {
            TableOptions::default()
        };
        let batch = Batch {
            table: table.to_string(),
            mode,
            options,
            records,
        };

        let jobs = build_job_runner(config)?;
        let unit = Unit::from_batch(format!("ingest:{table}"), database, batch);
        let summary = jobs.engine().run(vec![unit]).await;
        self.finish(&summary)
    }

    fn tables(
        &self,
        config: &AppConfig,
        database: &str,
        table: Option<&str>,
        limit: usize,
    ) -> Result<()> {
        let databases = DatabaseSet::from_config(&config.store);
        let db = databases.get(database)?;

        match table {
            None => {
                let tables = db.list_tables()?;
                self.output(&json!({ "database": database, "tables": tables }));
            }
            Some(table) => {
                let info = db
                    .describe_table(table)?
                    .ok_or_else(|| Error::schema(table, "table not found"))?;
                let preview = db.preview(table, limit)?;
                self.output(&json!({ "database": database, "table": info, "preview": preview }));
            }
        }
        Ok(())
    }

    /// Print the summary; any failed unit makes the command fail
    fn finish(&self, summary: &RunSummary) -> Result<()> {
        self.output(summary);
        if summary.all_succeeded() {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "{} of {} units failed",
                summary.failed,
                summary.units.len()
            )))
        }
    }

    fn output<T: Serialize>(&self, value: &T) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::IN_MEMORY;
    use crate::types::FieldValue;

    #[test]
    fn test_records_from_json_array_and_object() {
        let rows = records_from_json(r#"[{"a": 1}, {"b": "x"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("b"), Some(&FieldValue::from("x")));

        let single = records_from_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_records_from_json_rejects_scalars() {
        let err = records_from_json("42").unwrap_err();
        assert!(err.to_string().contains("a number"));
        assert!(records_from_json("not json").is_err());
    }

    #[tokio::test]
    async fn test_build_job_runner_in_memory() {
        let mut config = AppConfig::default();
        config.store.data_dir = IN_MEMORY.to_string();

        let jobs = build_job_runner(&config).unwrap();
        assert_eq!(jobs.timezone(), chrono_tz::Asia::Kolkata);
        assert_eq!(jobs.engine().config().max_workers, 5);
        assert!(jobs.engine().databases().get("bhavcopy").is_ok());
    }
}
