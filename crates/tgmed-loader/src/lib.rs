//! Idempotent loaders from the archive into the raw warehouse schema.
//!
//! Both loaders treat bad data as skips and persistence errors as
//! contained failures: one malformed file or one failed batch never
//! aborts a run. Re-running a load over the same archive is safe; the
//! warehouse's conflict handling deduplicates messages and the
//! detection log is only consumed in append order.

mod detections;
mod messages;
mod outcome;

pub use detections::load_detections;
pub use messages::load_messages;
pub use outcome::{LoadSummary, RecordOutcome};

use std::path::PathBuf;

use thiserror::Error;

/// Infrastructure failures that abort a load outright. Data problems
/// never show up here; they are counted in the [`LoadSummary`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Archive(#[from] tgmed_archive::ArchiveError),

    #[error("failed to read detection log {path}: {source}")]
    DetectionLogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
