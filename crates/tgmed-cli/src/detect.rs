//! `detect` — run the incremental object-detection scan.

use tgmed_archive::ArchiveLayout;
use tgmed_core::AppConfig;
use tgmed_detector::{scan_images, DetectorClient, ScanOptions};

pub(crate) async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let layout = ArchiveLayout::new(&config.archive_root);
    let detector_url = config.detector_base_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("detector base URL is not configured; set TGMED_DETECTOR_BASE_URL")
    })?;
    let client = DetectorClient::new(detector_url, config.detector_request_timeout_secs)?;
    let options = ScanOptions::from_app_config(config);

    let report = scan_images(&client, &layout, &options).await?;
    println!(
        "scanned {} images: {} detections appended, {} already processed, {} unparsable, {} failed",
        report.images_seen,
        report.detections_appended,
        report.images_skipped_checkpoint,
        report.images_unparsable,
        report.images_failed
    );
    Ok(())
}
