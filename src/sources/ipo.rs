//! Chittorgarh IPO reports

use super::{join_url, site_headers};
use crate::config::IpoConfig;
use crate::decode::JsonDecoder;
use crate::engine::{Batch, Fetcher};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::types::TableOptions;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::sync::Arc;

const REFERER_SITE: &str = "https://www.chittorgarh.com";

/// Which IPO listing a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpoBoard {
    Mainboard,
    Sme,
}

impl IpoBoard {
    pub const ALL: [IpoBoard; 2] = [IpoBoard::Mainboard, IpoBoard::Sme];

    /// Report id in the data-read API
    pub fn report_id(self) -> u32 {
        match self {
            IpoBoard::Mainboard => 21,
            IpoBoard::Sme => 22,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            IpoBoard::Mainboard => "mainboard_data",
            IpoBoard::Sme => "sme_data",
        }
    }
}

/// Indian financial year label, April to March: `2024-25`
pub fn financial_year(date: NaiveDate) -> String {
    let start = if date.month() > 3 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{start}-{:02}", (start + 1).rem_euclid(100))
}

/// Month report for one board, appended as a timestamped snapshot
#[derive(Debug, Clone)]
pub struct IpoReport {
    client: Arc<HttpClient>,
    config: IpoConfig,
    board: IpoBoard,
    date: NaiveDate,
}

impl IpoReport {
    pub const DATABASE: &'static str = "ipo";

    pub fn new(client: Arc<HttpClient>, config: IpoConfig, board: IpoBoard, date: NaiveDate) -> Self {
        Self {
            client,
            config,
            board,
            date,
        }
    }

    pub fn board(&self) -> IpoBoard {
        self.board
    }

    /// Report URL for the configured month, without query string
    pub fn report_url(&self) -> String {
        let path = format!(
            "/cloud/report/data-read/{}/1/{}/{}/{}/0/0/0",
            self.board.report_id(),
            self.date.month(),
            self.date.year(),
            financial_year(self.date)
        );
        join_url(&self.config.base_url, &path)
    }
}

#[async_trait]
impl Fetcher for IpoReport {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        let mut request = RequestConfig::new()
            .query("search", "")
            .query("v", &self.config.version);
        for (name, value) in site_headers(REFERER_SITE) {
            request = request.header(name, value);
        }

        let body: Value = self
            .client
            .get_json_with_config(&self.report_url(), request)
            .await?;
        let records = JsonDecoder::with_path("reportTableData")
            .or_root()
            .records(&body)?;

        Ok(vec![Batch::append(self.board.table(), records)
            .with_options(TableOptions::timestamped())])
    }
}
