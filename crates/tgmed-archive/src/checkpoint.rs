//! Durable set of already-processed content hashes.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::ArchiveError;

/// Append-only checkpoint backed by one hash per line.
///
/// Loading tolerates a missing file (fresh archive). Every insert is
/// flushed before returning, so a crash mid-scan never forgets work
/// that already completed.
#[derive(Debug)]
pub struct HashCheckpoint {
    path: PathBuf,
    seen: HashSet<String>,
    appender: File,
}

impl HashCheckpoint {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ArchiveError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let seen = load_hashes(&path)?;
        let appender = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ArchiveError::WriteFile {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            seen,
            appender,
        })
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    /// Records a hash, returning `false` if it was already present.
    /// Duplicates are not re-appended to the log.
    pub fn insert(&mut self, hash: &str) -> Result<bool, ArchiveError> {
        if !self.seen.insert(hash.to_string()) {
            return Ok(false);
        }
        writeln!(self.appender, "{hash}")
            .and_then(|()| self.appender.flush())
            .map_err(|source| ArchiveError::WriteFile {
                path: self.path.clone(),
                source,
            })?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn load_hashes(path: &Path) -> Result<HashSet<String>, ArchiveError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok(HashSet::new());
        }
        Err(source) => {
            return Err(ArchiveError::ReadFile {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut seen = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| ArchiveError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let hash = line.trim();
        if !hash.is_empty() {
            seen.insert(hash.to_string());
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty_set() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let checkpoint =
            HashCheckpoint::open(dir.path().join("processed/processed_images.log"))
                .expect("open checkpoint");
        assert!(checkpoint.is_empty());
        assert!(!checkpoint.contains("abc"));
    }

    #[test]
    fn inserts_survive_reopen() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("processed/processed_images.log");

        let mut checkpoint = HashCheckpoint::open(&path).expect("open checkpoint");
        assert!(checkpoint.insert("aaa").expect("insert"));
        assert!(checkpoint.insert("bbb").expect("insert"));
        drop(checkpoint);

        let checkpoint = HashCheckpoint::open(&path).expect("reopen checkpoint");
        assert_eq!(checkpoint.len(), 2);
        assert!(checkpoint.contains("aaa"));
        assert!(checkpoint.contains("bbb"));
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("processed/processed_images.log");

        let mut checkpoint = HashCheckpoint::open(&path).expect("open checkpoint");
        assert!(checkpoint.insert("aaa").expect("insert"));
        assert!(!checkpoint.insert("aaa").expect("duplicate insert"));
        drop(checkpoint);

        let body = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(body.lines().filter(|l| *l == "aaa").count(), 1);
    }

    #[test]
    fn blank_lines_in_log_are_ignored() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("processed/processed_images.log");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        std::fs::write(&path, "aaa\n\n  \nbbb\n").expect("seed log");

        let checkpoint = HashCheckpoint::open(&path).expect("open checkpoint");
        assert_eq!(checkpoint.len(), 2);
    }
}
