//! Cron scheduling of named jobs
//!
//! Each configured `job name -> cron` entry becomes a `tokio-cron-scheduler`
//! job evaluated in the configured time zone. A failing run is logged and
//! never stops the schedule.

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::jobs::{self, JobRunner};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

/// A started scheduler
pub struct Scheduler {
    inner: JobScheduler,
    jobs: Vec<String>,
}

impl Scheduler {
    /// Register every configured job and start ticking
    pub async fn start(runner: Arc<JobRunner>, config: &SchedulerConfig) -> Result<Self> {
        let tz = config.tz()?;
        let inner = JobScheduler::new().await.map_err(Error::scheduler)?;

        let mut names = Vec::with_capacity(config.jobs.len());
        for (name, cron) in &config.jobs {
            if !jobs::is_job(name) {
                return Err(Error::UnknownJob { name: name.clone() });
            }

            let job_runner = Arc::clone(&runner);
            let job_name = name.clone();
            let job = Job::new_async_tz(cron, tz, move |_uuid, _lock| {
                let runner = Arc::clone(&job_runner);
                let name = job_name.clone();
                Box::pin(async move {
                    run_logged(&runner, &name).await;
                })
            })
            .map_err(|e| Error::scheduler(format!("job '{name}' with cron '{cron}': {e}")))?;

            inner.add(job).await.map_err(Error::scheduler)?;
            tracing::info!(job = %name, cron = %cron, timezone = %tz, "Scheduled job");
            names.push(name.clone());
        }

        inner.start().await.map_err(Error::scheduler)?;

        if config.run_on_start {
            let startup = names.clone();
            tokio::spawn(async move {
                for name in startup {
                    run_logged(&runner, &name).await;
                }
            });
        }

        Ok(Self { inner, jobs: names })
    }

    /// Names of the scheduled jobs
    pub fn jobs(&self) -> &[String] {
        &self.jobs
    }

    /// Stop the scheduler
    pub async fn shutdown(mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(Error::scheduler)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

async fn run_logged(runner: &JobRunner, name: &str) {
    match runner.run(name).await {
        Ok(summary) if summary.all_succeeded() => {
            tracing::info!(job = name, rows = summary.rows_affected, "Scheduled run finished");
        }
        Ok(summary) => {
            tracing::warn!(
                job = name,
                failed = summary.failed,
                succeeded = summary.succeeded,
                "Scheduled run finished with failures"
            );
        }
        Err(e) => tracing::error!(job = name, error = %e, "Scheduled run failed"),
    }
}
