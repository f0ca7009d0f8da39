//! The unit-of-work interface every pipeline stage implements.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Identity of one node in the pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Harvest,
    LoadMessages,
    Detect,
    LoadDetections,
    Transform,
    Validate,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Harvest,
        StageId::LoadMessages,
        StageId::Detect,
        StageId::LoadDetections,
        StageId::Transform,
        StageId::Validate,
    ];

    /// Kebab-case name, also used as the `stage` column value in
    /// `pipeline_run_stages`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Harvest => "harvest",
            StageId::LoadMessages => "load-messages",
            StageId::Detect => "detect",
            StageId::LoadDetections => "load-detections",
            StageId::Transform => "transform",
            StageId::Validate => "validate",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stage ended up within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Never started because a dependency did not succeed.
    Skipped,
}

impl StageStatus {
    /// Lowercase name matching the `pipeline_run_stages.status` check
    /// constraint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Succeeded => "succeeded",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful result of one stage.
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    pub records_processed: u64,
    /// Human-readable notes for the run report (counters, warnings).
    pub detail: Option<String>,
}

/// Terminal failure of one stage. Carries the diagnostic text that ends
/// up in the run report and the `pipeline_run_stages.detail` column.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StageFailure {
    pub message: String,
}

impl StageFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One isolated unit of pipeline work.
///
/// The executor only ever sees this interface; whether the work happens
/// in-process (harvest, scan, load) or in a spawned subprocess
/// (transform, validate) is the implementation's business.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn run(&self) -> Result<StageOutcome, StageFailure>;
}

/// The stage implementations for one run, keyed by graph node.
#[derive(Default)]
pub struct StageSet {
    stages: HashMap<StageId, Box<dyn Stage>>,
}

impl StageSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the implementation for a node, replacing any previous one.
    pub fn register(&mut self, id: StageId, stage: Box<dyn Stage>) {
        self.stages.insert(id, stage);
    }

    pub(crate) fn get(&self, id: StageId) -> Option<&dyn Stage> {
        self.stages.get(&id).map(Box::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ids_render_kebab_case() {
        assert_eq!(StageId::Harvest.to_string(), "harvest");
        assert_eq!(StageId::LoadMessages.to_string(), "load-messages");
        assert_eq!(StageId::LoadDetections.to_string(), "load-detections");
    }

    #[test]
    fn statuses_match_warehouse_constraint_values() {
        for status in [
            StageStatus::Pending,
            StageStatus::Running,
            StageStatus::Succeeded,
            StageStatus::Failed,
            StageStatus::Skipped,
        ] {
            assert!(matches!(
                status.as_str(),
                "pending" | "running" | "succeeded" | "failed" | "skipped"
            ));
        }
    }
}
