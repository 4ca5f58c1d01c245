//! BSE corporate announcements

use super::site_headers;
use crate::config::BseConfig;
use crate::decode::JsonDecoder;
use crate::engine::{Batch, Fetcher};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::types::TableOptions;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;

const REFERER_SITE: &str = "https://www.bseindia.com";

/// Announcements published between two dates, upserted by `NEWSID`
#[derive(Debug, Clone)]
pub struct BseAnnouncements {
    client: Arc<HttpClient>,
    config: BseConfig,
    from: NaiveDate,
    to: NaiveDate,
}

impl BseAnnouncements {
    pub const DATABASE: &'static str = "announcements";
    pub const TABLE: &'static str = "announcements";

    pub fn new(client: Arc<HttpClient>, config: BseConfig, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            client,
            config,
            from,
            to,
        }
    }

    /// Window ending `to`, reaching back the configured number of days
    pub fn ending(client: Arc<HttpClient>, config: BseConfig, to: NaiveDate) -> Self {
        let from = to - chrono::Duration::days(config.lookback_days.max(0));
        Self::new(client, config, from, to)
    }

    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        (self.from, self.to)
    }

    fn request(&self) -> RequestConfig {
        let mut request = RequestConfig::new()
            .query("pageno", 1)
            .query("strCat", -1)
            .query("strPrevDate", self.from.format("%Y%m%d"))
            .query("strScrip", "")
            .query("strSearch", "P")
            .query("strToDate", self.to.format("%Y%m%d"))
            .query("strType", "C")
            .query("subcategory", -1)
            .header("Accept", "application/json");
        for (name, value) in site_headers(REFERER_SITE) {
            request = request.header(name, value);
        }
        request
    }
}

#[async_trait]
impl Fetcher for BseAnnouncements {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        let body: Value = self
            .client
            .get_json_with_config(&self.config.announcements_url, self.request())
            .await?;
        let records = JsonDecoder::with_path("Table").records(&body)?;

        Ok(vec![Batch::upsert(Self::TABLE, ["NEWSID"], records)
            .with_options(TableOptions::timestamped())])
    }
}
