//! External tool stages (dbt transform and validation runs).

use async_trait::async_trait;
use tracing::{info, warn};

use crate::stage::{Stage, StageFailure, StageId, StageOutcome};

/// Runs a configured command line as a pipeline stage.
///
/// The command line is split on whitespace; shell quoting is not
/// interpreted. Stdout and stderr are captured: stdout becomes the
/// outcome detail on success, stderr becomes the failure diagnostic on
/// a non-zero exit. An unset or blank command succeeds immediately so
/// deployments without the downstream tooling still get full runs.
pub struct CommandStage {
    id: StageId,
    command: Option<String>,
}

impl CommandStage {
    #[must_use]
    pub fn new(id: StageId, command: Option<String>) -> Self {
        Self { id, command }
    }
}

#[async_trait]
impl Stage for CommandStage {
    async fn run(&self) -> Result<StageOutcome, StageFailure> {
        let Some(command_line) = self
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            info!(stage = %self.id, "no command configured, passing through");
            return Ok(StageOutcome {
                records_processed: 0,
                detail: Some("not configured".to_owned()),
            });
        };

        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(StageOutcome {
                records_processed: 0,
                detail: Some("not configured".to_owned()),
            });
        };

        info!(stage = %self.id, command = command_line, "running external stage");
        let output = tokio::process::Command::new(program)
            .args(parts)
            .output()
            .await
            .map_err(|err| {
                StageFailure::new(format!("failed to launch '{program}': {err}"))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let status = output.status.code().map_or_else(
                || "terminated by signal".to_owned(),
                |code| format!("exited with status {code}"),
            );
            warn!(stage = %self.id, %status, "external stage failed");
            return Err(StageFailure::new(format!(
                "'{command_line}' {status}: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = stdout.trim();
        Ok(StageOutcome {
            records_processed: 0,
            detail: (!detail.is_empty()).then(|| detail.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_command_passes_through() {
        let stage = CommandStage::new(StageId::Transform, None);
        let outcome = stage.run().await.expect("pass-through");
        assert_eq!(outcome.detail.as_deref(), Some("not configured"));

        let blank = CommandStage::new(StageId::Transform, Some("   ".to_owned()));
        let outcome = blank.run().await.expect("pass-through");
        assert_eq!(outcome.detail.as_deref(), Some("not configured"));
    }

    #[tokio::test]
    async fn captures_stdout_as_detail() {
        let stage = CommandStage::new(StageId::Transform, Some("echo models built".to_owned()));
        let outcome = stage.run().await.expect("echo succeeds");
        assert_eq!(outcome.detail.as_deref(), Some("models built"));
        assert_eq!(outcome.records_processed, 0);
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_stage_failure() {
        let stage = CommandStage::new(StageId::Validate, Some("false".to_owned()));
        let failure = stage.run().await.expect_err("false exits 1");
        assert!(failure.message.contains("exited with status 1"), "{failure}");
    }

    #[tokio::test]
    async fn unlaunchable_command_is_a_stage_failure() {
        let stage = CommandStage::new(
            StageId::Validate,
            Some("/nonexistent/tgmed-transform-tool".to_owned()),
        );
        let failure = stage.run().await.expect_err("spawn fails");
        assert!(failure.message.contains("failed to launch"), "{failure}");
    }
}
