//! Topological stage execution with skip-on-failed-dependency.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::bookkeeping::RunBookkeeper;
use crate::graph::StageGraph;
use crate::stage::{StageId, StageSet, StageStatus};

/// Final state of one stage within a run.
#[derive(Debug, Clone)]
pub struct StageExecution {
    pub id: StageId,
    pub status: StageStatus,
    pub records_processed: u64,
    pub detail: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-stage results of one pipeline run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    stages: Vec<StageExecution>,
}

impl RunReport {
    #[must_use]
    pub fn stages(&self) -> &[StageExecution] {
        &self.stages
    }

    #[must_use]
    pub fn status_of(&self, id: StageId) -> Option<StageStatus> {
        self.stages.iter().find(|s| s.id == id).map(|s| s.status)
    }

    /// A run succeeded only if every stage succeeded; a skipped stage
    /// means an upstream failure, so the run as a whole did not.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.stages.is_empty()
            && self
                .stages
                .iter()
                .all(|s| s.status == StageStatus::Succeeded)
    }

    /// Names of stages that failed or were skipped, for diagnostics.
    #[must_use]
    pub fn unsuccessful_stages(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .filter(|s| s.status != StageStatus::Succeeded)
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Renders the per-stage table for stdout.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("| stage | status | records | detail |\n");
        out.push_str("|-------|--------|---------|--------|\n");
        for s in &self.stages {
            let detail = s
                .detail
                .as_deref()
                .unwrap_or("")
                .replace('\n', " ")
                .replace('|', "\\|");
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                s.id,
                s.status,
                s.records_processed,
                detail
            ));
        }
        out
    }
}

/// Runs every stage of `graph` in topological order.
///
/// A stage runs only once all of its dependencies have succeeded; a
/// failed or skipped dependency marks the stage skipped without ever
/// starting it. Failure in one branch does not stop a sibling branch
/// whose own dependencies succeeded. When a [`RunBookkeeper`] is
/// attached, every transition is mirrored into the warehouse run tables.
pub async fn execute(
    graph: &StageGraph,
    stages: &StageSet,
    bookkeeper: Option<&RunBookkeeper>,
) -> RunReport {
    let mut statuses: HashMap<StageId, StageStatus> = HashMap::new();
    let mut report = RunReport::default();

    for &id in graph.execution_order() {
        let unmet: Vec<String> = graph
            .dependencies_of(id)
            .iter()
            .filter_map(|dep| {
                let status = statuses
                    .get(dep)
                    .copied()
                    .unwrap_or(StageStatus::Pending);
                (status != StageStatus::Succeeded).then(|| format!("{dep} {status}"))
            })
            .collect();

        let execution = if unmet.is_empty() {
            run_stage(id, stages, bookkeeper).await
        } else {
            let detail = format!("dependency not satisfied: {}", unmet.join(", "));
            warn!(stage = %id, %detail, "skipping stage");
            StageExecution {
                id,
                status: StageStatus::Skipped,
                records_processed: 0,
                detail: Some(detail),
                started_at: None,
                completed_at: Some(Utc::now()),
            }
        };

        if let Some(bookkeeper) = bookkeeper {
            bookkeeper.stage_finished(&execution).await;
        }
        statuses.insert(id, execution.status);
        report.stages.push(execution);
    }

    report
}

async fn run_stage(
    id: StageId,
    stages: &StageSet,
    bookkeeper: Option<&RunBookkeeper>,
) -> StageExecution {
    let started_at = Utc::now();
    let Some(stage) = stages.get(id) else {
        error!(stage = %id, "no implementation registered for stage");
        return StageExecution {
            id,
            status: StageStatus::Failed,
            records_processed: 0,
            detail: Some("no implementation registered".to_owned()),
            started_at: Some(started_at),
            completed_at: Some(Utc::now()),
        };
    };

    info!(stage = %id, "stage starting");
    if let Some(bookkeeper) = bookkeeper {
        bookkeeper.stage_running(id).await;
    }

    match stage.run().await {
        Ok(outcome) => {
            info!(
                stage = %id,
                records = outcome.records_processed,
                "stage succeeded"
            );
            StageExecution {
                id,
                status: StageStatus::Succeeded,
                records_processed: outcome.records_processed,
                detail: outcome.detail,
                started_at: Some(started_at),
                completed_at: Some(Utc::now()),
            }
        }
        Err(failure) => {
            error!(stage = %id, error = %failure, "stage failed");
            StageExecution {
                id,
                status: StageStatus::Failed,
                records_processed: 0,
                detail: Some(failure.message),
                started_at: Some(started_at),
                completed_at: Some(Utc::now()),
            }
        }
    }
}
