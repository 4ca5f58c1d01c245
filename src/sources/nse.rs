//! NSE sources: index snapshot, listed companies, daily bhavcopy archive

use super::{join_url, site_headers};
use crate::config::NseConfig;
use crate::decode::{csv_entries, CsvDecoder, JsonDecoder, RecordDecoder};
use crate::engine::{Batch, Fetcher};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::types::{Record, TableOptions};
use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Index snapshot from `/api/allIndices`, upserted per index
#[derive(Debug, Clone)]
pub struct NseIndices {
    client: Arc<HttpClient>,
    config: NseConfig,
}

impl NseIndices {
    pub const DATABASE: &'static str = "indices";
    pub const TABLE: &'static str = "all_indices";
    pub const KEYS: [&'static str; 2] = ["key", "indexSymbol"];

    pub fn new(client: Arc<HttpClient>, config: NseConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Fetcher for NseIndices {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        // API calls are rejected without the home page cookies
        self.client.warm_up(&join_url(&self.config.base_url, "/")).await;

        let url = join_url(&self.config.base_url, &self.config.indices_path);
        let mut request = RequestConfig::new().header("Accept", "application/json");
        for (name, value) in site_headers(&self.config.base_url) {
            request = request.header(name, value);
        }

        let body: Value = self.client.get_json_with_config(&url, request).await?;
        let records = JsonDecoder::with_path("data").records(&body)?;
        tracing::debug!(records = records.len(), "Fetched NSE indices");

        Ok(vec![
            Batch::upsert(Self::TABLE, Self::KEYS, records).with_options(TableOptions::timestamped())
        ])
    }
}

/// `EQUITY_L.csv` listing, upserted by symbol
#[derive(Debug, Clone)]
pub struct ListedCompanies {
    client: Arc<HttpClient>,
    config: NseConfig,
}

impl ListedCompanies {
    pub const DATABASE: &'static str = "stock_market";
    pub const TABLE: &'static str = "listed_companies";

    pub fn new(client: Arc<HttpClient>, config: NseConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Fetcher for ListedCompanies {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        let body = self
            .client
            .get_bytes(&self.config.listed_companies_url, RequestConfig::new())
            .await?;
        let records = CsvDecoder::new().decode(&body)?;

        Ok(vec![Batch::upsert(Self::TABLE, ["SYMBOL"], records)])
    }
}

/// Table for an archive file: stem without digits, lower-cased.
///
/// `Pr171024.csv` and `PR171024.CSV` both land in `pr`.
pub fn bhavcopy_table(stem: &str) -> String {
    stem.chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .to_lowercase()
}

/// One trading day's bhavcopy zip, fanned out to a table per file
#[derive(Debug, Clone)]
pub struct Bhavcopy {
    client: Arc<HttpClient>,
    config: NseConfig,
    date: NaiveDate,
}

impl Bhavcopy {
    pub const DATABASE: &'static str = "bhavcopy";
    pub const STATUS_OK: &'static str = "OK";
    pub const STATUS_MISSING: &'static str = "MISSING";

    pub fn new(client: Arc<HttpClient>, config: NseConfig, date: NaiveDate) -> Self {
        Self {
            client,
            config,
            date,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Archive URL with the `ddmmyy` date filled in
    pub fn archive_url(&self) -> String {
        self.config
            .bhavcopy_url
            .replace("{date}", &self.date.format("%d%m%y").to_string())
    }

    /// Turn archive bytes into batches
    pub fn batches_from_archive(&self, bytes: &[u8]) -> Result<Vec<Batch>> {
        let source_date = self.date.format("%Y-%m-%d").to_string();
        let decoder = CsvDecoder::new();
        let mut tables: IndexMap<String, Vec<Record>> = IndexMap::new();
        let mut seen = HashSet::new();

        for entry in csv_entries(bytes)? {
            let table = bhavcopy_table(&entry.stem());
            if table.is_empty() {
                continue;
            }

            let records = match decoder.decode(&entry.data) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(file = %entry.name, error = %e, "Skipping unreadable bhavcopy file");
                    continue;
                }
            };
            seen.insert(table.clone());

            tables.entry(table).or_default().extend(records.into_iter().map(
                |mut record| {
                    record.insert("source_date", source_date.as_str());
                    record.insert("status", Self::STATUS_OK);
                    record
                },
            ));
        }

        for expected in &self.config.bhavcopy_expected_files {
            let table = expected.to_lowercase();
            if seen.contains(&table) {
                continue;
            }
            tracing::warn!(date = %source_date, file = %table, "Bhavcopy file missing from archive");
            tables.entry(table).or_default().push(
                Record::new()
                    .with("source_date", source_date.as_str())
                    .with("status", Self::STATUS_MISSING),
            );
        }

        Ok(tables
            .into_iter()
            .map(|(table, records)| Batch::append(table, records))
            .collect())
    }
}

#[async_trait]
impl Fetcher for Bhavcopy {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        let url = self.archive_url();
        tracing::info!(date = %self.date, url = %url, "Downloading bhavcopy");

        let bytes = self.client.get_bytes(&url, RequestConfig::new()).await?;
        self.batches_from_archive(&bytes)
    }
}
