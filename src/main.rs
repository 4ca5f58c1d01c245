//! market-ingest CLI
//!
//! Runs ingestion jobs, backfills and the HTTP server

use clap::Parser;
use market_ingest::cli::{Cli, Runner};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,reqwest=warn";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        tracing::error!(kind = ?e.kind(), "{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
