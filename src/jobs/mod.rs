//! Named ingestion jobs
//!
//! A job expands into one or more [`Unit`]s for the engine: one per day for
//! bhavcopy, one per feed for news, one per board for IPO reports and one
//! per symbol for Screener. Jobs are shared by the CLI, the scheduler and
//! the HTTP server.

mod catalog;

pub use catalog::{
    get_job, is_job, job_names, list_jobs, JobInfo, BHAVCOPY, BSE_ANNOUNCEMENTS, GOV_NEWS, IPO,
    LISTED_COMPANIES, NSE_INDICES, SCREENER,
};

use crate::engine::{IngestEngine, RunSummary, Unit};
use crate::error::{Error, Result};
use crate::sources::{
    BseAnnouncements, Bhavcopy, GovNewsFeed, IpoBoard, IpoReport, ListedCompanies, NseIndices,
    ScreenerCompany, SourceContext,
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Longest date range accepted for a backfill
pub const MAX_BACKFILL_DAYS: i64 = 366;

/// Builds units for named jobs and runs them on the engine
#[derive(Debug, Clone)]
pub struct JobRunner {
    engine: Arc<IngestEngine>,
    sources: SourceContext,
    timezone: Tz,
}

impl JobRunner {
    pub fn new(engine: Arc<IngestEngine>, sources: SourceContext, timezone: Tz) -> Self {
        Self {
            engine,
            sources,
            timezone,
        }
    }

    pub fn engine(&self) -> &Arc<IngestEngine> {
        &self.engine
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current date in the market time zone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Units for a job as of `date`
    pub fn units(&self, job: &str, date: NaiveDate) -> Result<Vec<Unit>> {
        let client = &self.sources.client;
        let config = &self.sources.config;

        let units = match job {
            BHAVCOPY => vec![self.bhavcopy_unit(date)],
            NSE_INDICES => vec![Unit::new(
                NSE_INDICES,
                NseIndices::DATABASE,
                NseIndices::TABLE,
                Arc::new(NseIndices::new(Arc::clone(client), config.nse.clone())),
            )],
            LISTED_COMPANIES => vec![Unit::new(
                LISTED_COMPANIES,
                ListedCompanies::DATABASE,
                ListedCompanies::TABLE,
                Arc::new(ListedCompanies::new(Arc::clone(client), config.nse.clone())),
            )],
            GOV_NEWS => config
                .gov_news
                .feeds
                .iter()
                .map(|feed| {
                    let source =
                        GovNewsFeed::new(Arc::clone(client), &config.gov_news.base_url, feed.clone());
                    Unit::new(
                        format!("{GOV_NEWS}:{}", feed.table),
                        GovNewsFeed::DATABASE,
                        &feed.table,
                        Arc::new(source),
                    )
                })
                .collect(),
            IPO => IpoBoard::ALL
                .iter()
                .map(|&board| {
                    let source =
                        IpoReport::new(Arc::clone(client), config.ipo.clone(), board, date);
                    Unit::new(
                        format!("{IPO}:{}", board.table()),
                        IpoReport::DATABASE,
                        board.table(),
                        Arc::new(source),
                    )
                })
                .collect(),
            BSE_ANNOUNCEMENTS => vec![Unit::new(
                BSE_ANNOUNCEMENTS,
                BseAnnouncements::DATABASE,
                BseAnnouncements::TABLE,
                Arc::new(BseAnnouncements::ending(
                    Arc::clone(client),
                    config.bse.clone(),
                    date,
                )),
            )],
            SCREENER => config
                .screener
                .symbols
                .iter()
                .map(|symbol| self.screener_unit(symbol))
                .collect(),
            other => {
                return Err(Error::UnknownJob {
                    name: other.to_string(),
                })
            }
        };

        Ok(units)
    }

    /// Bhavcopy unit for one trading date
    pub fn bhavcopy_unit(&self, date: NaiveDate) -> Unit {
        let source = Bhavcopy::new(
            Arc::clone(&self.sources.client),
            self.sources.config.nse.clone(),
            date,
        );
        Unit::new(
            format!("{BHAVCOPY}:{date}"),
            Bhavcopy::DATABASE,
            BHAVCOPY,
            Arc::new(source),
        )
    }

    /// Screener unit for one symbol, on the rate-limited scraping session
    pub fn screener_unit(&self, symbol: &str) -> Unit {
        let source = ScreenerCompany::new(
            Arc::clone(&self.sources.scraper),
            self.sources.config.screener.clone(),
            symbol,
        );
        Unit::new(
            format!("{SCREENER}:{}", source.symbol()),
            ScreenerCompany::DATABASE,
            ScreenerCompany::RATIOS_TABLE,
            Arc::new(source),
        )
    }

    /// One bhavcopy unit per calendar day in `from..=to`
    pub fn backfill_units(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Unit>> {
        if from > to {
            return Err(Error::invalid_value(
                "from",
                format!("start date {from} is after end date {to}"),
            ));
        }
        let days = (to - from).num_days() + 1;
        if days > MAX_BACKFILL_DAYS {
            return Err(Error::invalid_value(
                "to",
                format!("range of {days} days exceeds the limit of {MAX_BACKFILL_DAYS}"),
            ));
        }

        Ok(from
            .iter_days()
            .take_while(|day| *day <= to)
            .map(|day| self.bhavcopy_unit(day))
            .collect())
    }

    /// Run a job for today
    pub async fn run(&self, job: &str) -> Result<RunSummary> {
        self.run_for(job, self.today()).await
    }

    /// Run a job as of `date`
    pub async fn run_for(&self, job: &str, date: NaiveDate) -> Result<RunSummary> {
        let units = self.units(job, date)?;
        if units.is_empty() {
            tracing::warn!(job, "Job has no units to run");
        }

        tracing::info!(job, units = units.len(), "Running job");
        let summary = self.engine.run(units).await;

        if job == IPO {
            self.prune_ipo().await;
        }

        tracing::info!(
            job,
            succeeded = summary.succeeded,
            failed = summary.failed,
            rows = summary.rows_affected,
            "Job finished"
        );
        Ok(summary)
    }

    /// Fetch bhavcopy for every day in a range
    pub async fn backfill(&self, from: NaiveDate, to: NaiveDate) -> Result<RunSummary> {
        let units = self.backfill_units(from, to)?;
        tracing::info!(%from, %to, days = units.len(), "Starting bhavcopy backfill");
        Ok(self.engine.run(units).await)
    }

    /// Delete IPO rows older than the retention window; failures are logged
    async fn prune_ipo(&self) {
        let retention_days = self.sources.config.ipo.retention_days;
        let database = match self.engine.databases().get(IpoReport::DATABASE) {
            Ok(database) => database,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping IPO retention");
                return;
            }
        };

        let result = tokio::task::spawn_blocking(move || {
            IpoBoard::ALL.iter().try_fold(0usize, |total, board| {
                Ok::<_, Error>(total + database.prune_older_than(board.table(), retention_days)?)
            })
        })
        .await;

        match result {
            Ok(Ok(deleted)) => tracing::info!(deleted, retention_days, "Pruned IPO snapshots"),
            Ok(Err(e)) => tracing::warn!(error = %e, "IPO retention failed"),
            Err(e) => tracing::warn!(error = %e, "IPO retention task failed"),
        }
    }
}
