//! Per-record dispositions and run-level counters.

/// What happened to one record during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Submitted in a batch that the warehouse accepted. The warehouse
    /// may still have deduplicated it; see [`LoadSummary::rows_inserted`].
    Loaded,
    /// Left out of every batch, with the reason.
    Skipped(String),
    /// Was part of a batch whose insert failed.
    Failed(String),
}

/// Counters for one loader run.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Records the loader looked at: message files or detection-log lines.
    pub records_seen: u64,
    /// Records submitted in a successful batch.
    pub records_loaded: u64,
    /// Rows the warehouse actually added (conflict-skipped rows excluded).
    pub rows_inserted: u64,
    pub records_skipped: u64,
    /// Records lost to failed batches.
    pub records_failed: u64,
    pub failed_batches: u64,
    /// Partition directories ignored because their names were not dates.
    pub partitions_skipped: u64,
}

impl LoadSummary {
    pub(crate) fn tally(&mut self, outcome: &RecordOutcome) {
        self.records_seen += 1;
        match outcome {
            RecordOutcome::Loaded => self.records_loaded += 1,
            RecordOutcome::Skipped(_) => self.records_skipped += 1,
            RecordOutcome::Failed(_) => self.records_failed += 1,
        }
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_batches > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_buckets_outcomes() {
        let mut summary = LoadSummary::default();
        summary.tally(&RecordOutcome::Loaded);
        summary.tally(&RecordOutcome::Loaded);
        summary.tally(&RecordOutcome::Skipped("missing numeric id".to_owned()));
        summary.tally(&RecordOutcome::Failed("connection reset".to_owned()));

        assert_eq!(summary.records_seen, 4);
        assert_eq!(summary.records_loaded, 2);
        assert_eq!(summary.records_skipped, 1);
        assert_eq!(summary.records_failed, 1);
        assert!(!summary.has_failures());
    }
}
