//! india.gov.in news feeds

use super::{join_url, site_headers};
use crate::config::FeedConfig;
use crate::decode::JsonDecoder;
use crate::engine::{Batch, Fetcher};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::types::TableOptions;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// One news feed, POSTed with its JSON payload and appended to its table
#[derive(Debug, Clone)]
pub struct GovNewsFeed {
    client: Arc<HttpClient>,
    base_url: String,
    feed: FeedConfig,
}

impl GovNewsFeed {
    pub const DATABASE: &'static str = "news";

    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>, feed: FeedConfig) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            feed,
        }
    }

    pub fn table(&self) -> &str {
        &self.feed.table
    }
}

#[async_trait]
impl Fetcher for GovNewsFeed {
    async fn fetch(&self) -> Result<Vec<Batch>> {
        let url = join_url(&self.base_url, &self.feed.endpoint);
        let mut request = RequestConfig::new().json(self.feed.payload.clone());
        for (name, value) in site_headers(&self.base_url) {
            request = request.header(name, value);
        }

        let body: Value = self.client.post_json(&url, request).await?;
        let records = JsonDecoder::with_path(&self.feed.records_path).records(&body)?;
        tracing::debug!(feed = %self.feed.table, records = records.len(), "Fetched news feed");

        Ok(vec![Batch::append(&self.feed.table, records)
            .with_options(TableOptions::timestamped())])
    }
}
