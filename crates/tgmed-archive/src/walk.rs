//! Read-side traversal of the date-partitioned archive.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::warn;

use crate::{ArchiveError, ArchiveLayout};

/// One file found under a `<date>/<channel>` partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub date: NaiveDate,
    pub channel_dir: String,
    pub path: PathBuf,
}

/// Result of walking one partition root.
#[derive(Debug, Default)]
pub struct ArchiveWalk {
    /// Files in deterministic (path-sorted) order.
    pub files: Vec<ArchiveFile>,
    /// Top-level directories whose names did not parse as `YYYY-MM-DD`.
    pub skipped_dirs: Vec<PathBuf>,
}

/// Walks `raw/telegram_messages`, returning every message file.
pub fn walk_messages(layout: &ArchiveLayout) -> Result<ArchiveWalk, ArchiveError> {
    walk_partitions(&layout.messages_root())
}

/// Walks `raw/telegram_images`, returning every downloaded media file.
pub fn walk_images(layout: &ArchiveLayout) -> Result<ArchiveWalk, ArchiveError> {
    walk_partitions(&layout.images_root())
}

/// A missing root is an empty archive, not an error; anything else
/// under it that fails to read is.
fn walk_partitions(root: &Path) -> Result<ArchiveWalk, ArchiveError> {
    let mut walk = ArchiveWalk::default();
    let date_dirs = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(walk),
        Err(source) => {
            return Err(ArchiveError::ReadFile {
                path: root.to_path_buf(),
                source,
            })
        }
    };

    for entry in date_dirs {
        let entry = entry.map_err(|source| ArchiveError::ReadFile {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(date) = NaiveDate::parse_from_str(&name, "%Y-%m-%d") else {
            warn!(dir = %path.display(), "skipping non-date partition directory");
            walk.skipped_dirs.push(path);
            continue;
        };
        collect_channel_dirs(&path, date, &mut walk)?;
    }

    walk.files.sort_by(|a, b| a.path.cmp(&b.path));
    walk.skipped_dirs.sort();
    Ok(walk)
}

fn collect_channel_dirs(
    date_dir: &Path,
    date: NaiveDate,
    walk: &mut ArchiveWalk,
) -> Result<(), ArchiveError> {
    let channel_dirs = std::fs::read_dir(date_dir).map_err(|source| ArchiveError::ReadFile {
        path: date_dir.to_path_buf(),
        source,
    })?;
    for entry in channel_dirs {
        let entry = entry.map_err(|source| ArchiveError::ReadFile {
            path: date_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let channel_dir = entry.file_name().to_string_lossy().into_owned();
        collect_files(&path, date, &channel_dir, walk)?;
    }
    Ok(())
}

fn collect_files(
    channel_dir_path: &Path,
    date: NaiveDate,
    channel_dir: &str,
    walk: &mut ArchiveWalk,
) -> Result<(), ArchiveError> {
    let files = std::fs::read_dir(channel_dir_path).map_err(|source| ArchiveError::ReadFile {
        path: channel_dir_path.to_path_buf(),
        source,
    })?;
    for entry in files {
        let entry = entry.map_err(|source| ArchiveError::ReadFile {
            path: channel_dir_path.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        walk.files.push(ArchiveFile {
            date,
            channel_dir: channel_dir.to_string(),
            path,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(root: &Path, relative: &str, body: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
        std::fs::write(path, body).expect("write seed file");
    }

    #[test]
    fn missing_root_yields_empty_walk() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = ArchiveLayout::new(dir.path());

        let walk = walk_images(&layout).expect("walk empty archive");

        assert!(walk.files.is_empty());
        assert!(walk.skipped_dirs.is_empty());
    }

    #[test]
    fn walk_finds_files_across_partitions_in_sorted_order() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = ArchiveLayout::new(dir.path());
        seed(
            dir.path(),
            "raw/telegram_images/2025-07-11/CheMed/chemed_2.jpg",
            b"b",
        );
        seed(
            dir.path(),
            "raw/telegram_images/2025-07-10/CheMed/chemed_1.jpg",
            b"a",
        );
        seed(
            dir.path(),
            "raw/telegram_images/2025-07-10/Lobelia_Cosmetics/lobelia4cosmetics_5.png",
            b"c",
        );

        let walk = walk_images(&layout).expect("walk archive");

        let names: Vec<_> = walk
            .files
            .iter()
            .map(|f| {
                (
                    f.date.to_string(),
                    f.channel_dir.clone(),
                    f.path
                        .file_name()
                        .expect("file name")
                        .to_string_lossy()
                        .into_owned(),
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![
                (
                    "2025-07-10".to_string(),
                    "CheMed".to_string(),
                    "chemed_1.jpg".to_string()
                ),
                (
                    "2025-07-10".to_string(),
                    "Lobelia_Cosmetics".to_string(),
                    "lobelia4cosmetics_5.png".to_string()
                ),
                (
                    "2025-07-11".to_string(),
                    "CheMed".to_string(),
                    "chemed_2.jpg".to_string()
                ),
            ]
        );
    }

    #[test]
    fn non_date_directories_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = ArchiveLayout::new(dir.path());
        seed(
            dir.path(),
            "raw/telegram_messages/2025-07-10/CheMed/1.json",
            b"{}",
        );
        seed(
            dir.path(),
            "raw/telegram_messages/not-a-date/CheMed/2.json",
            b"{}",
        );

        let walk = walk_messages(&layout).expect("walk archive");

        assert_eq!(walk.files.len(), 1);
        assert_eq!(walk.skipped_dirs.len(), 1);
        assert!(walk.skipped_dirs[0].ends_with("not-a-date"));
    }

    #[test]
    fn stray_files_at_partition_levels_are_ignored() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = ArchiveLayout::new(dir.path());
        seed(
            dir.path(),
            "raw/telegram_messages/2025-07-10/CheMed/1.json",
            b"{}",
        );
        seed(dir.path(), "raw/telegram_messages/README.txt", b"notes");
        seed(
            dir.path(),
            "raw/telegram_messages/2025-07-10/manifest.txt",
            b"notes",
        );

        let walk = walk_messages(&layout).expect("walk archive");

        assert_eq!(walk.files.len(), 1);
        assert!(walk.skipped_dirs.is_empty());
    }
}
