//! Filename and content metadata helpers for archived media.

use std::path::Path;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::ArchiveError;

/// Pulls the Telegram message id out of a media file name.
///
/// Downloads are named `<channel>_<message_id>.<ext>`, so the id is the
/// trailing digit run before a known image extension. Returns `None`
/// for names that do not follow the convention.
pub fn extract_message_id(file_name: &str) -> Option<i64> {
    let pattern = Regex::new(r"(?i)_(\d+)\.(jpg|jpeg|png|gif|bmp)$")
        .expect("valid message id regex");
    let captures = pattern.captures(file_name)?;
    captures[1].parse().ok()
}

/// SHA-256 of the file's bytes, lowercase hex. This is the identity the
/// checkpoint tracks, so renamed or re-downloaded copies of the same
/// image are still recognized.
pub fn content_hash(path: &Path) -> Result<String, ArchiveError> {
    let bytes = std::fs::read(path).map_err(|source| ArchiveError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hash_bytes(&bytes))
}

/// SHA-256 of in-memory bytes, for callers that already hold the file.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
