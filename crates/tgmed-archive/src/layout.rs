//! Path derivation and write operations for the partitioned archive.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tgmed_core::records::{channel_dir_name, HarvestedMessage};

use crate::ArchiveError;

const MESSAGES_SUBDIR: &str = "raw/telegram_messages";
const IMAGES_SUBDIR: &str = "raw/telegram_images";
const CHECKPOINT_FILE: &str = "processed/processed_images.log";
const DETECTION_LOG_FILE: &str = "processed/yolo_detections.jsonl";

/// Derives every archive path from a single configured root.
///
/// Cheap to clone; holds only the root path.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding message JSON for one channel on one date.
    pub fn message_dir(&self, date: NaiveDate, channel_title: &str) -> PathBuf {
        self.root
            .join(MESSAGES_SUBDIR)
            .join(date.format("%Y-%m-%d").to_string())
            .join(channel_dir_name(channel_title))
    }

    /// Full path for one message file, named by message id.
    pub fn message_path(&self, date: NaiveDate, channel_title: &str, message_id: i64) -> PathBuf {
        self.message_dir(date, channel_title)
            .join(format!("{message_id}.json"))
    }

    /// Directory holding downloaded media for one channel on one date.
    pub fn image_dir(&self, date: NaiveDate, channel_title: &str) -> PathBuf {
        self.root
            .join(IMAGES_SUBDIR)
            .join(date.format("%Y-%m-%d").to_string())
            .join(channel_dir_name(channel_title))
    }

    pub fn image_path(&self, date: NaiveDate, channel_title: &str, file_name: &str) -> PathBuf {
        self.image_dir(date, channel_title).join(file_name)
    }

    pub fn messages_root(&self) -> PathBuf {
        self.root.join(MESSAGES_SUBDIR)
    }

    pub fn images_root(&self) -> PathBuf {
        self.root.join(IMAGES_SUBDIR)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.root.join(CHECKPOINT_FILE)
    }

    pub fn detection_log_path(&self) -> PathBuf {
        self.root.join(DETECTION_LOG_FILE)
    }

    /// Writes one harvested message, creating partition directories as
    /// needed. Pretty-printed so the files stay greppable by hand.
    pub async fn write_message(
        &self,
        date: NaiveDate,
        channel_title: &str,
        message: &HarvestedMessage,
    ) -> Result<PathBuf, ArchiveError> {
        let Some(message_id) = message.message_id() else {
            return Err(ArchiveError::WriteFile {
                path: self.message_dir(date, channel_title),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "message has no numeric id",
                ),
            });
        };
        let dir = self.message_dir(date, channel_title);
        create_dir_all(&dir).await?;
        let path = dir.join(format!("{message_id}.json"));
        let body =
            serde_json::to_vec_pretty(message).map_err(|source| ArchiveError::Serialize {
                path: path.clone(),
                source,
            })?;
        write_file(&path, &body).await?;
        Ok(path)
    }

    /// Writes one downloaded media file into the image partition.
    pub async fn write_media(
        &self,
        date: NaiveDate,
        channel_title: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ArchiveError> {
        let dir = self.image_dir(date, channel_title);
        create_dir_all(&dir).await?;
        let path = dir.join(file_name);
        write_file(&path, bytes).await?;
        Ok(path)
    }
}

async fn create_dir_all(path: &Path) -> Result<(), ArchiveError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| ArchiveError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ArchiveError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| ArchiveError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout() -> (tempfile::TempDir, ArchiveLayout) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = ArchiveLayout::new(dir.path());
        (dir, layout)
    }

    #[test]
    fn message_path_partitions_by_date_and_channel() {
        let layout = ArchiveLayout::new("/data");
        let date = NaiveDate::from_ymd_opt(2025, 7, 10).expect("valid date");
        let path = layout.message_path(date, "Chemed Pharma", 4211);
        assert_eq!(
            path,
            PathBuf::from("/data/raw/telegram_messages/2025-07-10/Chemed_Pharma/4211.json")
        );
    }

    #[test]
    fn image_path_partitions_by_date_and_channel() {
        let layout = ArchiveLayout::new("/data");
        let date = NaiveDate::from_ymd_opt(2025, 7, 10).expect("valid date");
        let path = layout.image_path(date, "Lobelia Cosmetics", "lobelia4cosmetics_99.jpg");
        assert_eq!(
            path,
            PathBuf::from(
                "/data/raw/telegram_images/2025-07-10/Lobelia_Cosmetics/lobelia4cosmetics_99.jpg"
            )
        );
    }

    #[test]
    fn bookkeeping_paths_live_under_processed() {
        let layout = ArchiveLayout::new("/data");
        assert_eq!(
            layout.checkpoint_path(),
            PathBuf::from("/data/processed/processed_images.log")
        );
        assert_eq!(
            layout.detection_log_path(),
            PathBuf::from("/data/processed/yolo_detections.jsonl")
        );
    }

    #[tokio::test]
    async fn write_message_creates_partition_and_file() {
        let (_guard, layout) = layout();
        let date = NaiveDate::from_ymd_opt(2025, 7, 10).expect("valid date");
        let message = HarvestedMessage::new(
            json!({"id": 17, "message": "paracetamol restock"}),
            "chemed123",
            "CheMed",
        );

        let path = layout
            .write_message(date, "CheMed", &message)
            .await
            .expect("write message");

        assert!(path.ends_with("raw/telegram_messages/2025-07-10/CheMed/17.json"));
        let body = std::fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(value["id"], 17);
        assert_eq!(value["channel_username"], "chemed123");
    }

    #[tokio::test]
    async fn write_message_without_id_is_rejected() {
        let (_guard, layout) = layout();
        let date = NaiveDate::from_ymd_opt(2025, 7, 10).expect("valid date");
        let message = HarvestedMessage::new(json!({"message": "no id"}), "chemed123", "CheMed");

        let err = layout
            .write_message(date, "CheMed", &message)
            .await
            .expect_err("message without id");
        assert!(matches!(err, ArchiveError::WriteFile { .. }));
    }

    #[tokio::test]
    async fn write_media_round_trips_bytes() {
        let (_guard, layout) = layout();
        let date = NaiveDate::from_ymd_opt(2025, 7, 11).expect("valid date");

        let path = layout
            .write_media(date, "Lobelia Cosmetics", "lobelia4cosmetics_3.jpg", b"\xff\xd8")
            .await
            .expect("write media");

        assert_eq!(std::fs::read(&path).expect("read back"), b"\xff\xd8");
    }
}
