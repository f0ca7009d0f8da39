//! Recurring pipeline runs.
//!
//! Registers a single cron job that starts a fresh pipeline run from
//! the graph root on every tick, in the configured fixed UTC offset.

use std::sync::Arc;

use chrono::FixedOffset;
use sqlx::PgPool;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};

use tgmed_core::AppConfig;

use crate::run_pipeline;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("pipeline UTC offset of {0} hours is out of range")]
    InvalidUtcOffset(i32),
    #[error(transparent)]
    Scheduler(#[from] JobSchedulerError),
}

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept
/// alive for the lifetime of the process. Dropping it shuts down all
/// scheduled jobs.
///
/// # Errors
///
/// Returns [`SchedulerError`] if the configured UTC offset or cron
/// expression is invalid, or if the scheduler cannot be initialised or
/// started.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, SchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_pipeline_job(&scheduler, pool, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring full-pipeline job.
///
/// The schedule comes from `pipeline_cron`, evaluated in the fixed
/// offset given by `pipeline_utc_offset_hours` (the feeds' local day
/// boundary, not the host's).
async fn register_pipeline_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), SchedulerError> {
    let offset_hours = config.pipeline_utc_offset_hours;
    let timezone = offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or(SchedulerError::InvalidUtcOffset(offset_hours))?;

    let cron = config.pipeline_cron.clone();
    let job = Job::new_async_tz(
        cron.as_str(),
        timezone,
        move |_uuid, _lock| {
            let pool = pool.clone();
            let config = Arc::clone(&config);

            Box::pin(async move {
                info!("scheduler: starting pipeline run");
                run_scheduled(&pool, &config).await;
                info!("scheduler: pipeline run finished");
            })
        },
    )?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_scheduled(pool: &PgPool, config: &AppConfig) {
    let report = match run_pipeline(pool, config, "scheduler", false).await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "scheduler: cannot assemble pipeline stages");
            return;
        }
    };

    for stage in report.stages() {
        info!(
            stage = %stage.id,
            status = %stage.status,
            records = stage.records_processed,
            "scheduler: stage result"
        );
    }
    if report.succeeded() {
        info!("scheduler: pipeline run succeeded");
    } else {
        error!(
            stages = report.unsuccessful_stages().join(", "),
            "scheduler: pipeline run did not fully succeed"
        );
    }
}
