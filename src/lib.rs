// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Market Ingest
//!
//! Aggregates Indian stock-market data (NSE, BSE, IPO boards, government
//! news, Screener fundamentals) into per-domain DuckDB databases.
//!
//! Records arrive with whatever columns the upstream source publishes. Every
//! write sanitizes column names into safe identifiers, evolves the table
//! schema to fit, then appends or upserts the rows.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use market_ingest::cli::build_job_runner;
//! use market_ingest::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> market_ingest::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let jobs = build_job_runner(&config)?;
//!
//!     let summary = jobs.run("nse_indices").await?;
//!     println!("{} rows written", summary.rows_affected);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │          CLI / HTTP server / Scheduler  →  JobRunner           │
//! └────────────────────────────────────────────────────────────────┘
//!                                │ units
//! ┌──────────────────────────────┴─────────────────────────────────┐
//! │   IngestEngine: bounded worker pool, one failure per unit       │
//! └────────────────────────────────────────────────────────────────┘
//!          │ fetch                                  │ persist
//! ┌────────┴─────────┬──────────┐        ┌──────────┴──────────────┐
//! │ Sources          │ Decode   │        │ Sanitize → Schema →      │
//! │ NSE, BSE, IPO,   │ JSON,CSV │        │ RecordWriter (DuckDB)    │
//! │ news, Screener   │ HTML,zip │        │ append / upsert          │
//! └──────────────────┴──────────┘        └─────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Records, field values and write modes
pub mod types;

/// Column and record sanitization
pub mod sanitize;

/// Per-domain DuckDB databases
pub mod database;

/// Schema registry and table evolution
pub mod schema;

/// Record writer (append / upsert)
pub mod output;

/// Batch orchestration
pub mod engine;

/// Application configuration
pub mod config;

/// HTTP client with retry and rate limiting
pub mod http;

/// Response decoders (JSON, CSV, HTML, zip)
pub mod decode;

/// Upstream market data sources
pub mod sources;

/// Named jobs and the job runner
pub mod jobs;

/// Cron scheduling of jobs
pub mod scheduler;

/// Command-line interface and HTTP server
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

pub use engine::{Batch, IngestEngine, RunSummary, Unit, UnitResult};
pub use jobs::JobRunner;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
