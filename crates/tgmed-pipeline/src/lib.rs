//! Orchestration of the ingestion pipeline.
//!
//! The six stages (harvest, load-messages, detect, load-detections,
//! transform, validate) form a fixed dependency graph executed in
//! topological order. Each stage is an isolated unit of work behind the
//! [`Stage`] trait; a failed stage skips every transitive dependent
//! while sibling branches keep going. Run and stage transitions are
//! mirrored into the warehouse when bookkeeping is available.

mod bookkeeping;
mod command_stage;
mod executor;
mod graph;
mod scheduler;
mod stage;
mod stages;

use sqlx::PgPool;
use tgmed_core::AppConfig;
use tracing::warn;

pub use bookkeeping::RunBookkeeper;
pub use command_stage::CommandStage;
pub use executor::{execute, RunReport, StageExecution};
pub use graph::{GraphError, StageGraph, StageNode};
pub use scheduler::{build_scheduler, SchedulerError};
pub use stage::{Stage, StageFailure, StageId, StageOutcome, StageSet, StageStatus};
pub use stages::{
    standard_stages, DetectStage, HarvestStage, LoadDetectionsStage, LoadMessagesStage,
    StageBuildError,
};

/// Executes one full pipeline run over the standard graph.
///
/// Scheduled ticks and `pipeline run` from the CLI both come through
/// here, so both get identical semantics: fresh stage set from live
/// configuration, warehouse bookkeeping when the run tables are
/// reachable, and a [`RunReport`] either way.
///
/// # Errors
///
/// Returns [`StageBuildError`] only when the stage set cannot be
/// assembled (bad channel registry, missing detector URL). Stage
/// failures during the run are reported in the [`RunReport`], not as
/// an error.
pub async fn run_pipeline(
    pool: &PgPool,
    config: &AppConfig,
    trigger_source: &str,
    skip_externals: bool,
) -> Result<RunReport, StageBuildError> {
    let stages = standard_stages(config, pool, skip_externals)?;
    let graph = StageGraph::standard();

    let bookkeeper = match RunBookkeeper::begin(pool, trigger_source).await {
        Ok(bookkeeper) => Some(bookkeeper),
        Err(err) => {
            warn!(error = %err, "run bookkeeping unavailable, continuing without");
            None
        }
    };

    let report = execute(&graph, &stages, bookkeeper.as_ref()).await;
    if let Some(bookkeeper) = &bookkeeper {
        bookkeeper.finish(&report).await;
    }
    Ok(report)
}
