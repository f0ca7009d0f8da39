//! Checkpoint-driven scan over the image partition.

use std::collections::HashSet;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tgmed_archive::{
    content_hash, extract_message_id, ArchiveFile, ArchiveLayout, DetectionLogWriter,
    HashCheckpoint,
};
use tgmed_core::records::DetectionRecord;
use tgmed_core::AppConfig;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{Detection, DetectorClient};
use crate::DetectError;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub confidence_threshold: f64,
    pub iou_threshold: f64,
    /// Inference requests in flight at once; 1 keeps the scan strictly
    /// sequential.
    pub max_concurrent_images: usize,
}

impl ScanOptions {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            confidence_threshold: config.detector_confidence_threshold,
            iou_threshold: config.detector_iou_threshold,
            max_concurrent_images: config.detector_max_concurrent_images,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_concurrent_images: 1,
        }
    }
}

/// Counters for one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub images_seen: u64,
    pub images_skipped_checkpoint: u64,
    pub images_unparsable: u64,
    pub images_failed: u64,
    pub detections_appended: u64,
}

struct PendingImage {
    file: ArchiveFile,
    hash: String,
    message_id: i64,
}

struct ImageOutcome {
    appended: u64,
    failed: bool,
}

/// Scans every archived image that the checkpoint has not seen yet.
///
/// The scan is incremental by content hash: a hash already in the
/// checkpoint is skipped outright, and every attempted hash is marked
/// processed whether inference succeeded or failed, so no image is ever
/// retried across scans. Images whose file names do not carry a
/// parseable message id are marked and counted without inference.
///
/// # Errors
///
/// Individual image failures are counted in the report; only
/// infrastructure failures (archive walk, checkpoint or log I/O) abort
/// the scan.
pub async fn scan_images(
    client: &DetectorClient,
    layout: &ArchiveLayout,
    opts: &ScanOptions,
) -> Result<ScanReport, DetectError> {
    let walk = tgmed_archive::walk_images(layout)?;
    let mut checkpoint = HashCheckpoint::open(layout.checkpoint_path())?;
    let log = DetectionLogWriter::open(layout.detection_log_path())?;

    let mut report = ScanReport {
        images_seen: walk.files.len() as u64,
        ..ScanReport::default()
    };
    info!(
        images = report.images_seen,
        already_processed = checkpoint.len(),
        "starting image scan"
    );

    // First pass: hash and filter sequentially, so duplicate content
    // inside one scan is skipped exactly like content from prior scans.
    let mut pending: Vec<PendingImage> = Vec::new();
    let mut queued: HashSet<String> = HashSet::new();
    for file in walk.files {
        let hash = match content_hash(&file.path) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(path = %file.path.display(), error = %err, "unreadable image, will retry next scan");
                report.images_failed += 1;
                continue;
            }
        };
        if checkpoint.contains(&hash) || queued.contains(&hash) {
            debug!(path = %file.path.display(), "skipping already-processed image");
            report.images_skipped_checkpoint += 1;
            continue;
        }
        let file_name = file.path.file_name().map(|n| n.to_string_lossy().into_owned());
        let Some(message_id) = file_name.as_deref().and_then(extract_message_id) else {
            warn!(path = %file.path.display(), "cannot parse message id from file name");
            checkpoint.insert(&hash)?;
            report.images_unparsable += 1;
            continue;
        };
        queued.insert(hash.clone());
        pending.push(PendingImage {
            file,
            hash,
            message_id,
        });
    }

    // Second pass: bounded-concurrency inference. Checkpoint and log sit
    // behind locks; append order across images is not meaningful.
    let checkpoint = Mutex::new(checkpoint);
    let log = Mutex::new(log);
    let outcomes: Vec<ImageOutcome> = stream::iter(pending.into_iter().map(|image| {
        let checkpoint = &checkpoint;
        let log = &log;
        async move { process_image(client, checkpoint, log, image, opts).await }
    }))
    .buffer_unordered(opts.max_concurrent_images.max(1))
    .try_collect()
    .await?;

    for outcome in outcomes {
        report.detections_appended += outcome.appended;
        if outcome.failed {
            report.images_failed += 1;
        }
    }

    info!(
        appended = report.detections_appended,
        skipped = report.images_skipped_checkpoint,
        unparsable = report.images_unparsable,
        failed = report.images_failed,
        "image scan complete"
    );
    Ok(report)
}

async fn process_image(
    client: &DetectorClient,
    checkpoint: &Mutex<HashCheckpoint>,
    log: &Mutex<DetectionLogWriter>,
    image: PendingImage,
    opts: &ScanOptions,
) -> Result<ImageOutcome, DetectError> {
    let bytes = match tokio::fs::read(&image.file.path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(path = %image.file.path.display(), error = %err, "image vanished before inference");
            checkpoint.lock().await.insert(&image.hash)?;
            return Ok(ImageOutcome {
                appended: 0,
                failed: true,
            });
        }
    };

    let outcome = match client
        .detect(&bytes, opts.confidence_threshold, opts.iou_threshold)
        .await
    {
        Ok(detections) => {
            debug!(
                path = %image.file.path.display(),
                detections = detections.len(),
                "inference complete"
            );
            let mut appended = 0u64;
            let mut log = log.lock().await;
            for detection in &detections {
                let record = detection_record(&image, detection);
                match log.append(&record) {
                    Ok(()) => appended += 1,
                    Err(err) => {
                        // Log I/O failure is infrastructure, not data.
                        drop(log);
                        checkpoint.lock().await.insert(&image.hash)?;
                        return Err(err.into());
                    }
                }
            }
            drop(log);
            ImageOutcome {
                appended,
                failed: false,
            }
        }
        Err(err) => {
            warn!(path = %image.file.path.display(), error = %err, "inference failed");
            ImageOutcome {
                appended: 0,
                failed: true,
            }
        }
    };

    // Marked whether inference worked or not: one attempt per hash, ever.
    checkpoint.lock().await.insert(&image.hash)?;
    Ok(outcome)
}

fn detection_record(image: &PendingImage, detection: &Detection) -> DetectionRecord {
    DetectionRecord {
        message_id: image.message_id,
        image_path: image.file.path.display().to_string(),
        scraped_date: image.file.date,
        channel_name: image.file.channel_dir.clone(),
        detected_object_class: detection.class_name.clone(),
        confidence_score: detection.confidence,
        timestamp: Utc::now(),
        bounding_box: detection.bounding_box,
    }
}
