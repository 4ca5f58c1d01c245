//! CLI commands and argument parsing

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Indian market data ingestion CLI
#[derive(Parser, Debug)]
#[command(name = "market-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a named job once
    Run {
        /// Job name (see `jobs`)
        job: String,

        /// Run as of this date instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Fetch bhavcopy for every day in a date range
    Backfill {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },

    /// Write records from a JSON file into a table
    Ingest {
        /// Domain database
        #[arg(short, long)]
        database: String,

        /// Destination table
        #[arg(short, long)]
        table: String,

        /// Upsert key fields (comma-separated); append when empty
        #[arg(short, long, value_delimiter = ',')]
        keys: Vec<String>,

        /// JSON file holding an array of objects (stdin when absent)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Add a created_at column
        #[arg(long)]
        timestamped: bool,
    },

    /// List tables of a database, or describe one table
    Tables {
        /// Domain database
        database: String,

        /// Table to describe
        table: Option<String>,

        /// Rows to preview when describing a table
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// List built-in jobs
    Jobs,

    /// Start the HTTP server, with the scheduler when enabled
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
}
