//! Screener company pages

use super::join_url;
use crate::config::ScreenerConfig;
use crate::decode::{extract_ratios, extract_tables};
use crate::engine::{Batch, Fetcher};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::sanitize::sanitize_identifier;
use crate::types::{JsonObject, JsonValue, Record, TableOptions};
use async_trait::async_trait;
use std::sync::Arc;

/// Statement tables and headline ratios for one symbol
#[derive(Debug, Clone)]
pub struct ScreenerCompany {
    client: Arc<HttpClient>,
    config: ScreenerConfig,
    symbol: String,
}

impl ScreenerCompany {
    pub const DATABASE: &'static str = "screener";
    pub const RATIOS_TABLE: &'static str = "financial_ratios";
    const TABLE_PREFIX: &'static str = "tables_";

    pub fn new(client: Arc<HttpClient>, config: ScreenerConfig, symbol: impl Into<String>) -> Self {
        Self {
            client,
            config,
            symbol: symbol.into().trim().to_uppercase(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn page_url(&self) -> String {
        join_url(
            &self.config.base_url,
            &format!("/company/{}/{}/", self.symbol, self.config.statement),
        )
    }

    /// Turn a company page into batches
    pub fn batches_from_page(&self, html: &str) -> Result<Vec<Batch>> {
        let context = Record::new().with("symbol", self.symbol.as_str());
        let mut batches = Vec::new();

        let ratios = extract_ratios(html)?;
        if !ratios.is_empty() {
            let object: JsonObject = ratios
                .into_iter()
                .map(|(key, value)| (key, JsonValue::String(value)))
                .collect();
            let rows = Record::key_value_rows(object, &context);
            batches.push(
                Batch::upsert(Self::RATIOS_TABLE, ["symbol", "key"], rows)
                    .with_options(TableOptions::timestamped()),
            );
        }

        for table in extract_tables(html)? {
            let name = format!(
                "{}{}",
                Self::TABLE_PREFIX,
                sanitize_identifier(&table.name).as_str()
            );
            let records: Vec<Record> = table
                .records()
                .into_iter()
                .map(|row| {
                    let mut record = context.clone();
                    for (field, value) in row.iter() {
                        record.insert(field.clone(), value.clone());
                    }
                    record
                })
                .collect();
            if records.is_empty() {
                continue;
            }
            batches.push(Batch::append(name, records).with_options(TableOptions::timestamped()));
        }

        Ok(batches)
    }
}

#[async_trait]
impl Fetcher for ScreenerCompany {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        let url = self.page_url();
        let html = self.client.get_text(&url, RequestConfig::new()).await?;
        let batches = self.batches_from_page(&html)?;
        tracing::debug!(symbol = %self.symbol, tables = batches.len(), "Scraped company page");
        Ok(batches)
    }
}
