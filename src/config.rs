//! Application configuration
//!
//! Loaded from an optional YAML file, then overridden from
//! `MARKET_INGEST_*` environment variables. Every field has a default so an
//! empty file (or no file) yields a working configuration.

use crate::engine::EngineConfig;
use crate::error::{Error, Result};
use crate::types::{BackoffType, JsonValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "MARKET_INGEST_";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load from an optional YAML file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!(
                        "Failed to read config file '{}': {e}",
                        path.display()
                    ))
                })?;
                Self::parse_yaml(&content)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML without consulting the environment
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config = Self::parse_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))
    }

    /// Apply `MARKET_INGEST_*` overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        if let Some(dir) = var("DATA_DIR") {
            self.store.data_dir = dir;
        }
        if let Some(workers) = var("MAX_WORKERS") {
            self.engine.max_workers = parse_env("MAX_WORKERS", &workers)?;
        }
        if let Some(secs) = var("FETCH_TIMEOUT_SECS") {
            self.engine.fetch_timeout_secs = parse_env("FETCH_TIMEOUT_SECS", &secs)?;
        }
        if let Some(enabled) = var("SCHEDULER_ENABLED") {
            self.scheduler.enabled = parse_bool("SCHEDULER_ENABLED", &enabled)?;
        }
        if let Some(port) = var("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(tz) = var("TIMEZONE") {
            self.scheduler.timezone = tz;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.data_dir.trim().is_empty() {
            return Err(Error::missing_field("store.data_dir"));
        }
        if self.store.databases.is_empty() {
            return Err(Error::invalid_value(
                "store.databases",
                "at least one database is required",
            ));
        }
        if self.engine.max_workers == 0 {
            return Err(Error::invalid_value(
                "engine.max_workers",
                "must be greater than zero",
            ));
        }
        if self.engine.fetch_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "engine.fetch_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.sources.ipo.retention_days <= 0 {
            return Err(Error::invalid_value(
                "sources.ipo.retention_days",
                "must be greater than zero",
            ));
        }
        if !self.sources.nse.bhavcopy_url.contains("{date}") {
            return Err(Error::invalid_value(
                "sources.nse.bhavcopy_url",
                "must contain a {date} placeholder",
            ));
        }

        let s = &self.sources;
        for (field, value) in [
            ("sources.nse.base_url", &s.nse.base_url),
            ("sources.nse.listed_companies_url", &s.nse.listed_companies_url),
            ("sources.gov_news.base_url", &s.gov_news.base_url),
            ("sources.ipo.base_url", &s.ipo.base_url),
            ("sources.bse.announcements_url", &s.bse.announcements_url),
            ("sources.screener.base_url", &s.screener.base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::invalid_value(field, format!("'{value}': {e}")))?;
        }

        self.scheduler.tz()?;

        for (job, cron) in &self.scheduler.jobs {
            if cron.split_whitespace().count() < 6 {
                return Err(Error::invalid_value(
                    format!("scheduler.jobs.{job}"),
                    format!("'{cron}' is not a six-field cron expression"),
                ));
            }
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::invalid_value(format!("{ENV_PREFIX}{name}"), format!("{e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        other => Err(Error::invalid_value(
            format!("{ENV_PREFIX}{name}"),
            format!("'{other}' is not a boolean"),
        )),
    }
}

// ============================================================================
// Store
// ============================================================================

/// Where the domain databases live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of `.duckdb` files, or `:memory:`
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Domain name to database file stem
    #[serde(default = "default_databases")]
    pub databases: BTreeMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            databases: default_databases(),
        }
    }
}

/// Domain databases known out of the box
pub const DOMAINS: [&str; 7] = [
    "announcements",
    "bhavcopy",
    "indices",
    "ipo",
    "news",
    "screener",
    "stock_market",
];

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_databases() -> BTreeMap<String, String> {
    DOMAINS
        .iter()
        .map(|d| ((*d).to_string(), (*d).to_string()))
        .collect()
}

// ============================================================================
// Engine
// ============================================================================

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Upper bound on one unit's fetch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_max_workers(self.max_workers)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
    }
}

fn default_max_workers() -> usize {
    5
}

fn default_fetch_timeout() -> u64 {
    120
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration shared by all sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Browser-like user agent; the market sites reject bare clients
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36"
        .to_string()
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Randomize each delay between zero and the computed value
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            jitter: true,
        }
    }
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    30_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

fn default_rps() -> u32 {
    5
}

fn default_burst() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Sources
// ============================================================================

/// Per-source endpoints and knobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub nse: NseConfig,

    #[serde(default)]
    pub gov_news: GovNewsConfig,

    #[serde(default)]
    pub ipo: IpoConfig,

    #[serde(default)]
    pub bse: BseConfig,

    #[serde(default)]
    pub screener: ScreenerConfig,
}

/// NSE endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NseConfig {
    /// Home page, visited once per session for cookies
    #[serde(default = "default_nse_base")]
    pub base_url: String,

    #[serde(default = "default_indices_path")]
    pub indices_path: String,

    #[serde(default = "default_listed_url")]
    pub listed_companies_url: String,

    /// Archive URL with a `{date}` placeholder (ddmmyy)
    #[serde(default = "default_bhavcopy_url")]
    pub bhavcopy_url: String,

    /// Files every archive should contain; absent ones get a marker row
    #[serde(default = "default_expected_files")]
    pub bhavcopy_expected_files: Vec<String>,
}

impl Default for NseConfig {
    fn default() -> Self {
        Self {
            base_url: default_nse_base(),
            indices_path: default_indices_path(),
            listed_companies_url: default_listed_url(),
            bhavcopy_url: default_bhavcopy_url(),
            bhavcopy_expected_files: default_expected_files(),
        }
    }
}

fn default_nse_base() -> String {
    "https://www.nseindia.com".to_string()
}

fn default_indices_path() -> String {
    "/api/allIndices".to_string()
}

fn default_listed_url() -> String {
    "https://archives.nseindia.com/content/equities/EQUITY_L.csv".to_string()
}

fn default_bhavcopy_url() -> String {
    "https://nsearchives.nseindia.com/archives/equities/bhavcopy/pr/PR{date}.zip".to_string()
}

fn default_expected_files() -> Vec<String> {
    [
        "bc", "bh", "corpbond", "gl", "hl", "pd", "pr", "sme", "tt", "mcap", "fo", "debt", "eq",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Government news feeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovNewsConfig {
    #[serde(default = "default_gov_base")]
    pub base_url: String,

    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
}

impl Default for GovNewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_gov_base(),
            feeds: default_feeds(),
        }
    }
}

/// One POST feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Destination table
    pub table: String,
    /// Path appended to the base URL
    pub endpoint: String,
    /// JSON body sent with the request
    #[serde(default)]
    pub payload: JsonValue,
    /// Dotted path to the record list in the response
    pub records_path: String,
}

fn default_gov_base() -> String {
    "https://india.gov.in".to_string()
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            table: "news_on_air".to_string(),
            endpoint: "/news/news-on-air/dataservices/getnewsonair".to_string(),
            payload: json!({"mustFilter": [], "pageNumber": 1, "pageSize": 15}),
            records_path: "newsOnAirResponse.results".to_string(),
        },
        FeedConfig {
            table: "pib_ministry".to_string(),
            endpoint: "/news/pib-news/dataservices/getpibministry".to_string(),
            payload: json!({"pageNumber": 1, "pageSize": 100}),
            records_path: "pibnewsMinistryResponse.results".to_string(),
        },
        FeedConfig {
            table: "pib_news".to_string(),
            endpoint: "/news/pib-news/dataservices/getpibnews".to_string(),
            payload: json!({"npiFilters": [], "pageNumber": 1, "pageSize": 15}),
            records_path: "pibnewResponse.results".to_string(),
        },
        FeedConfig {
            table: "dd_news".to_string(),
            endpoint: "/news/dd-news/dataservices/getddnews".to_string(),
            payload: json!({"mustFilter": [], "pageNumber": 1, "pageSize": 15}),
            records_path: "ddnewResponse.results".to_string(),
        },
    ]
}

/// Chittorgarh IPO reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpoConfig {
    #[serde(default = "default_ipo_base")]
    pub base_url: String,

    /// Report API version query parameter
    #[serde(default = "default_ipo_version")]
    pub version: String,

    /// Rows older than this are pruned after each run
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for IpoConfig {
    fn default() -> Self {
        Self {
            base_url: default_ipo_base(),
            version: default_ipo_version(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_ipo_base() -> String {
    "https://webnodejs.chittorgarh.com".to_string()
}

fn default_ipo_version() -> String {
    "15-25".to_string()
}

fn default_retention_days() -> i64 {
    7
}

/// BSE corporate announcements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BseConfig {
    #[serde(default = "default_bse_url")]
    pub announcements_url: String,

    /// Days before today included in each fetch
    #[serde(default)]
    pub lookback_days: i64,
}

impl Default for BseConfig {
    fn default() -> Self {
        Self {
            announcements_url: default_bse_url(),
            lookback_days: 0,
        }
    }
}

fn default_bse_url() -> String {
    "https://api.bseindia.com/BseIndiaAPI/api/AnnSubCategoryGetData/w".to_string()
}

/// Screener company pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    #[serde(default = "default_screener_base")]
    pub base_url: String,

    /// `consolidated` or `standalone`
    #[serde(default = "default_statement")]
    pub statement: String,

    /// Symbols scraped by the scheduled job
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: default_screener_base(),
            statement: default_statement(),
            symbols: Vec::new(),
        }
    }
}

fn default_screener_base() -> String {
    "https://www.screener.in".to_string()
}

fn default_statement() -> String {
    "consolidated".to_string()
}

// ============================================================================
// Scheduler
// ============================================================================

/// Periodic job triggering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub enabled: bool,

    /// IANA time zone the cron expressions are evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Run every scheduled job once at startup
    #[serde(default = "default_true")]
    pub run_on_start: bool,

    /// Job name to six-field cron expression
    #[serde(default = "default_schedule")]
    pub jobs: BTreeMap<String, String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timezone: default_timezone(),
            run_on_start: true,
            jobs: default_schedule(),
        }
    }
}

impl SchedulerConfig {
    /// Parsed time zone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| Error::invalid_value("scheduler.timezone", e.to_string()))
    }
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

fn default_schedule() -> BTreeMap<String, String> {
    [
        ("bhavcopy", "0 0 19 * * Mon-Fri"),
        ("nse_indices", "0 0 * * * *"),
        ("listed_companies", "0 0 */5 * * *"),
        ("gov_news", "0 */30 * * * *"),
        ("ipo", "0 0 */6 * * *"),
        ("bse_announcements", "0 */15 * * * *"),
        ("screener", "0 30 20 * * Mon-Fri"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect()
}

// ============================================================================
// Server
// ============================================================================

/// HTTP API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}
