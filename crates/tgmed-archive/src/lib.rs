//! Partitioned on-disk archive for harvested Telegram content.
//!
//! The archive is the boundary between collection and everything
//! downstream: the harvester only writes, the scanner and loaders only
//! read. Layout is date-partitioned under a single root:
//!
//! ```text
//! <root>/raw/telegram_messages/<YYYY-MM-DD>/<Channel_Title>/<id>.json
//! <root>/raw/telegram_images/<YYYY-MM-DD>/<Channel_Title>/<file>
//! <root>/processed/processed_images.log
//! <root>/processed/yolo_detections.jsonl
//! ```

mod checkpoint;
mod detection_log;
mod layout;
mod metadata;
mod walk;

pub use checkpoint::HashCheckpoint;
pub use detection_log::DetectionLogWriter;
pub use layout::ArchiveLayout;
pub use metadata::{content_hash, extract_message_id, hash_bytes};
pub use walk::{walk_images, walk_messages, ArchiveFile, ArchiveWalk};

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by archive reads and writes.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
