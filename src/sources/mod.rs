//! Market data sources
//!
//! Each source is a [`Fetcher`](crate::engine::Fetcher) that turns one
//! upstream endpoint into batches for a single domain database:
//!
//! | Source | Database | Tables |
//! |--------|----------|--------|
//! | [`NseIndices`] | `indices` | `all_indices` |
//! | [`ListedCompanies`] | `stock_market` | `listed_companies` |
//! | [`Bhavcopy`] | `bhavcopy` | one per archive file |
//! | [`GovNewsFeed`] | `news` | one per feed |
//! | [`IpoReport`] | `ipo` | `mainboard_data`, `sme_data` |
//! | [`BseAnnouncements`] | `announcements` | `announcements` |
//! | [`ScreenerCompany`] | `screener` | `tables_*`, `financial_ratios` |

mod bse;
mod gov_news;
mod ipo;
mod nse;
mod screener;

pub use bse::BseAnnouncements;
pub use gov_news::GovNewsFeed;
pub use ipo::{financial_year, IpoBoard, IpoReport};
pub use nse::{bhavcopy_table, Bhavcopy, ListedCompanies, NseIndices};
pub use screener::ScreenerCompany;

use crate::config::{HttpConfig, SourcesConfig};
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RateLimiterConfig};
use std::sync::Arc;

/// Shared HTTP sessions and source settings
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Session for JSON and file endpoints
    pub client: Arc<HttpClient>,
    /// Session for scraped HTML pages, limited to one request per second
    pub scraper: Arc<HttpClient>,
    pub config: Arc<SourcesConfig>,
}

impl SourceContext {
    /// Build both sessions from the HTTP settings
    pub fn new(http: &HttpConfig, config: SourcesConfig) -> Result<Self> {
        let client = HttpClient::with_config(HttpClientConfig::from(http))?;
        let scraper = HttpClient::with_config(
            HttpClientConfigBuilder::from_config(HttpClientConfig::from(http))
                .rate_limit(RateLimiterConfig::polite())
                .build(),
        )?;

        Ok(Self {
            client: Arc::new(client),
            scraper: Arc::new(scraper),
            config: Arc::new(config),
        })
    }

    /// Context over an existing client, used for both sessions
    pub fn with_client(client: HttpClient, config: SourcesConfig) -> Self {
        let client = Arc::new(client);
        Self {
            scraper: Arc::clone(&client),
            client,
            config: Arc::new(config),
        }
    }
}

/// `Origin`/`Referer` pair some endpoints check before answering
fn site_headers(origin: &str) -> [(&'static str, String); 2] {
    let origin = origin.trim_end_matches('/');
    [("Origin", origin.to_string()), ("Referer", format!("{origin}/"))]
}

/// Join a base URL and a path with exactly one slash
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests;
