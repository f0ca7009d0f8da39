//! Incremental object-detection scanner over the image archive.
//!
//! Every image is identified by the SHA-256 of its bytes; the durable
//! checkpoint guarantees each distinct image gets at most one inference
//! attempt across all scans. Detection results go to the append-only
//! JSONL log for the warehouse loader to pick up.

mod client;
mod scan;

pub use client::{DetectorClient, Detection};
pub use scan::{scan_images, ScanOptions, ScanReport};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Archive(#[from] tgmed_archive::ArchiveError),
}
