//! Built-in job definitions
//!
//! Every schedulable job, with the database and tables it writes to.

use serde::Serialize;

/// Job metadata for display
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub database: &'static str,
    pub tables: &'static [&'static str],
}

pub const BHAVCOPY: &str = "bhavcopy";
pub const NSE_INDICES: &str = "nse_indices";
pub const LISTED_COMPANIES: &str = "listed_companies";
pub const GOV_NEWS: &str = "gov_news";
pub const IPO: &str = "ipo";
pub const BSE_ANNOUNCEMENTS: &str = "bse_announcements";
pub const SCREENER: &str = "screener";

static JOBS: &[JobInfo] = &[
    JobInfo {
        name: BHAVCOPY,
        description: "NSE daily bhavcopy archive, one table per file",
        database: "bhavcopy",
        tables: &[
            "pr", "bc", "bh", "corpbond", "gl", "hl", "pd", "sme", "tt", "mcap", "fo", "debt", "eq",
        ],
    },
    JobInfo {
        name: NSE_INDICES,
        description: "NSE index snapshot, upserted per index",
        database: "indices",
        tables: &["all_indices"],
    },
    JobInfo {
        name: LISTED_COMPANIES,
        description: "NSE equity listing, upserted by symbol",
        database: "stock_market",
        tables: &["listed_companies"],
    },
    JobInfo {
        name: GOV_NEWS,
        description: "india.gov.in news feeds",
        database: "news",
        tables: &["news_on_air", "pib_ministry", "pib_news", "dd_news"],
    },
    JobInfo {
        name: IPO,
        description: "Chittorgarh mainboard and SME IPO reports, pruned by retention",
        database: "ipo",
        tables: &["mainboard_data", "sme_data"],
    },
    JobInfo {
        name: BSE_ANNOUNCEMENTS,
        description: "BSE corporate announcements, upserted by news id",
        database: "announcements",
        tables: &["announcements"],
    },
    JobInfo {
        name: SCREENER,
        description: "Screener statements and ratios for configured symbols",
        database: "screener",
        tables: &["financial_ratios", "tables_*"],
    },
];

/// Get detailed info about all built-in jobs
pub fn list_jobs() -> &'static [JobInfo] {
    JOBS
}

/// Get a job by name
pub fn get_job(name: &str) -> Option<&'static JobInfo> {
    JOBS.iter().find(|job| job.name == name)
}

/// Check if a name is a built-in job
pub fn is_job(name: &str) -> bool {
    get_job(name).is_some()
}

/// All job names in catalog order
pub fn job_names() -> Vec<&'static str> {
    JOBS.iter().map(|job| job.name).collect()
}
