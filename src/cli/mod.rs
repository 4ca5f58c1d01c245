//! CLI module
//!
//! Command-line interface for running ingestion jobs.
//!
//! # Commands
//!
//! - `run` - Run a named job once
//! - `backfill` - Fetch bhavcopy for a date range
//! - `ingest` - Write records from a JSON file into a table
//! - `tables` - List or describe tables of a domain database
//! - `jobs` - List built-in jobs
//! - `serve` - Start HTTP server mode with the scheduler

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{build_job_runner, records_from_json, Runner};
pub use server::{router, serve};
