//! Mirrors run and stage transitions into the warehouse run tables.

use sqlx::PgPool;
use tgmed_db::DbError;
use tracing::{error, info, warn};

use crate::executor::{RunReport, StageExecution};
use crate::stage::StageId;

/// Handle on one `pipeline_runs` row.
///
/// Bookkeeping is best-effort after [`RunBookkeeper::begin`]: a
/// warehouse hiccup while recording a stage transition is logged and
/// swallowed, because losing the audit row must never kill the run
/// that is being audited.
pub struct RunBookkeeper {
    pool: PgPool,
    run_id: i64,
}

impl RunBookkeeper {
    /// Creates the run row and moves it to `running`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the run row cannot be created or started;
    /// callers may then run without bookkeeping.
    pub async fn begin(pool: &PgPool, trigger_source: &str) -> Result<Self, DbError> {
        let run = tgmed_db::create_pipeline_run(pool, trigger_source).await?;
        tgmed_db::start_pipeline_run(pool, run.id).await?;
        info!(
            run_id = run.id,
            public_id = %run.public_id,
            trigger_source,
            "pipeline run started"
        );
        Ok(Self {
            pool: pool.clone(),
            run_id: run.id,
        })
    }

    #[must_use]
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub(crate) async fn stage_running(&self, id: StageId) {
        if let Err(err) = tgmed_db::upsert_run_stage(
            &self.pool,
            self.run_id,
            id.as_str(),
            "running",
            None,
            None,
        )
        .await
        {
            warn!(run_id = self.run_id, stage = %id, error = %err, "failed to record stage start");
        }
    }

    pub(crate) async fn stage_finished(&self, execution: &StageExecution) {
        let records = i32::try_from(execution.records_processed).unwrap_or(i32::MAX);
        if let Err(err) = tgmed_db::upsert_run_stage(
            &self.pool,
            self.run_id,
            execution.id.as_str(),
            execution.status.as_str(),
            Some(records),
            execution.detail.as_deref(),
        )
        .await
        {
            warn!(
                run_id = self.run_id,
                stage = %execution.id,
                error = %err,
                "failed to record stage result"
            );
        }
    }

    /// Moves the run row to its terminal status matching the report.
    pub async fn finish(&self, report: &RunReport) {
        let result = if report.succeeded() {
            tgmed_db::complete_pipeline_run(&self.pool, self.run_id).await
        } else {
            let message = format!(
                "unsuccessful stages: {}",
                report.unsuccessful_stages().join(", ")
            );
            tgmed_db::fail_pipeline_run(&self.pool, self.run_id, &message).await
        };

        if let Err(err) = result {
            error!(run_id = self.run_id, error = %err, "failed to finalize pipeline run row");
        }
    }
}
