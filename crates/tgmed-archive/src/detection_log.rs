//! Append-only JSONL log of detection results.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tgmed_core::records::DetectionRecord;

use crate::ArchiveError;

/// Appends one JSON object per line to `processed/yolo_detections.jsonl`.
///
/// Each append is flushed so concurrent scan tasks behind a lock never
/// interleave partial lines.
#[derive(Debug)]
pub struct DetectionLogWriter {
    path: PathBuf,
    file: File,
}

impl DetectionLogWriter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ArchiveError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ArchiveError::WriteFile {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, file })
    }

    pub fn append(&mut self, record: &DetectionRecord) -> Result<(), ArchiveError> {
        let line = serde_json::to_string(record).map_err(|source| ArchiveError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        writeln!(self.file, "{line}")
            .and_then(|()| self.file.flush())
            .map_err(|source| ArchiveError::WriteFile {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use tgmed_core::records::BoundingBox;

    fn record(message_id: i64, class: &str) -> DetectionRecord {
        DetectionRecord {
            message_id,
            image_path: format!("/data/raw/telegram_images/2025-07-10/CheMed/chemed_{message_id}.jpg"),
            scraped_date: NaiveDate::from_ymd_opt(2025, 7, 10).expect("valid date"),
            channel_name: "CheMed".to_string(),
            detected_object_class: class.to_string(),
            confidence_score: 0.91,
            timestamp: Utc::now(),
            bounding_box: Some(BoundingBox {
                x1: 1.0,
                y1: 2.0,
                x2: 30.0,
                y2: 44.5,
            }),
        }
    }

    #[test]
    fn appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("processed/yolo_detections.jsonl");

        let mut writer = DetectionLogWriter::open(&path).expect("open log");
        writer.append(&record(1, "bottle")).expect("append");
        writer.append(&record(2, "person")).expect("append");
        drop(writer);

        let body = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).expect("line is json");
            assert!(value["detected_object_class"].is_string());
        }
    }

    #[test]
    fn reopen_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("processed/yolo_detections.jsonl");

        DetectionLogWriter::open(&path)
            .expect("open log")
            .append(&record(1, "bottle"))
            .expect("append");
        DetectionLogWriter::open(&path)
            .expect("reopen log")
            .append(&record(2, "person"))
            .expect("append");

        let body = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(body.lines().count(), 2);
    }
}
