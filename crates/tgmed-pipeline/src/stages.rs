//! In-process stage adapters around the harvester, scanner, and loaders.

use async_trait::async_trait;
use sqlx::PgPool;
use tgmed_archive::ArchiveLayout;
use tgmed_core::{load_channels, AppConfig, ChannelConfig, ConfigError};
use tgmed_detector::{scan_images, DetectError, DetectorClient, ScanOptions};
use tgmed_harvester::{harvest_channels, GatewayClient, HarvestError, HarvestOptions};
use tgmed_loader::{load_detections, load_messages};
use thiserror::Error;

use crate::command_stage::CommandStage;
use crate::stage::{Stage, StageFailure, StageId, StageOutcome, StageSet};

/// Failure to assemble the standard stage set from live configuration.
#[derive(Debug, Error)]
pub enum StageBuildError {
    #[error("detector base URL is not configured; set TGMED_DETECTOR_BASE_URL")]
    DetectorNotConfigured,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build gateway client: {0}")]
    Gateway(#[from] HarvestError),
    #[error("failed to build detector client: {0}")]
    Detector(#[from] DetectError),
}

/// Feed harvest as a pipeline stage.
pub struct HarvestStage {
    client: GatewayClient,
    layout: ArchiveLayout,
    channels: Vec<ChannelConfig>,
    options: HarvestOptions,
}

impl HarvestStage {
    #[must_use]
    pub fn new(
        client: GatewayClient,
        layout: ArchiveLayout,
        channels: Vec<ChannelConfig>,
        options: HarvestOptions,
    ) -> Self {
        Self {
            client,
            layout,
            channels,
            options,
        }
    }
}

#[async_trait]
impl Stage for HarvestStage {
    async fn run(&self) -> Result<StageOutcome, StageFailure> {
        let report = harvest_channels(&self.client, &self.layout, &self.channels, &self.options)
            .await
            .map_err(|err| StageFailure::new(format!("harvest aborted: {err}")))?;

        if report.all_channels_failed() {
            return Err(StageFailure::new(format!(
                "all {} channels failed to harvest",
                report.channels.len()
            )));
        }

        let mut detail = format!(
            "{} channels; {} media files",
            report.channels.len(),
            report.total_media_downloaded()
        );
        if report.failed_channels() > 0 {
            detail.push_str(&format!("; {} channels failed", report.failed_channels()));
        }
        Ok(StageOutcome {
            records_processed: report.total_messages_archived(),
            detail: Some(detail),
        })
    }
}

/// Incremental image scan as a pipeline stage.
///
/// Per-image inference failures are absorbed by the checkpoint and only
/// reported in the detail text; the stage fails solely on
/// infrastructure errors (archive walk, checkpoint or log I/O).
pub struct DetectStage {
    client: DetectorClient,
    layout: ArchiveLayout,
    options: ScanOptions,
}

impl DetectStage {
    #[must_use]
    pub fn new(client: DetectorClient, layout: ArchiveLayout, options: ScanOptions) -> Self {
        Self {
            client,
            layout,
            options,
        }
    }
}

#[async_trait]
impl Stage for DetectStage {
    async fn run(&self) -> Result<StageOutcome, StageFailure> {
        let report = scan_images(&self.client, &self.layout, &self.options)
            .await
            .map_err(|err| StageFailure::new(format!("scan aborted: {err}")))?;

        Ok(StageOutcome {
            records_processed: report.detections_appended,
            detail: Some(format!(
                "{} images seen; {} already processed; {} unparsable; {} failed",
                report.images_seen,
                report.images_skipped_checkpoint,
                report.images_unparsable,
                report.images_failed
            )),
        })
    }
}

/// Message-archive load as a pipeline stage.
///
/// The loader itself keeps going past a failed channel/date batch; the
/// stage surfaces those lost batches as a failure so downstream
/// transformation never runs on a partially loaded day.
pub struct LoadMessagesStage {
    pool: PgPool,
    layout: ArchiveLayout,
}

impl LoadMessagesStage {
    #[must_use]
    pub fn new(pool: PgPool, layout: ArchiveLayout) -> Self {
        Self { pool, layout }
    }
}

#[async_trait]
impl Stage for LoadMessagesStage {
    async fn run(&self) -> Result<StageOutcome, StageFailure> {
        let summary = load_messages(&self.pool, &self.layout)
            .await
            .map_err(|err| StageFailure::new(err.to_string()))?;

        if summary.has_failures() {
            return Err(StageFailure::new(format!(
                "{} message batch(es) failed; {} rows inserted by the batches that committed",
                summary.failed_batches, summary.rows_inserted
            )));
        }
        Ok(StageOutcome {
            records_processed: summary.rows_inserted,
            detail: Some(format!(
                "{} files seen; {} skipped; {} partition dirs ignored",
                summary.records_seen, summary.records_skipped, summary.partitions_skipped
            )),
        })
    }
}

/// Detection-log load as a pipeline stage.
pub struct LoadDetectionsStage {
    pool: PgPool,
    layout: ArchiveLayout,
    batch_size: usize,
}

impl LoadDetectionsStage {
    #[must_use]
    pub fn new(pool: PgPool, layout: ArchiveLayout, batch_size: usize) -> Self {
        Self {
            pool,
            layout,
            batch_size,
        }
    }
}

#[async_trait]
impl Stage for LoadDetectionsStage {
    async fn run(&self) -> Result<StageOutcome, StageFailure> {
        let summary = load_detections(&self.pool, &self.layout, self.batch_size)
            .await
            .map_err(|err| StageFailure::new(err.to_string()))?;

        if summary.has_failures() {
            return Err(StageFailure::new(format!(
                "{} detection batch(es) failed; {} rows inserted by the batches that committed",
                summary.failed_batches, summary.rows_inserted
            )));
        }
        Ok(StageOutcome {
            records_processed: summary.rows_inserted,
            detail: Some(format!(
                "{} log lines seen; {} skipped",
                summary.records_seen, summary.records_skipped
            )),
        })
    }
}

/// Builds the full stage set for one run from live configuration.
///
/// `skip_externals` replaces the transform and validate commands with
/// pass-through stages, for runs that should stop at the warehouse.
///
/// # Errors
///
/// Returns [`StageBuildError`] if the channel registry cannot be
/// loaded, the detector is not configured, or an HTTP client cannot be
/// constructed.
pub fn standard_stages(
    config: &AppConfig,
    pool: &PgPool,
    skip_externals: bool,
) -> Result<StageSet, StageBuildError> {
    let layout = ArchiveLayout::new(&config.archive_root);
    let channels = load_channels(&config.channels_path)?.channels;

    let gateway = GatewayClient::new(
        &config.gateway_base_url,
        config.gateway_api_token.clone(),
        config.harvest_request_timeout_secs,
    )?;
    let detector_url = config
        .detector_base_url
        .as_deref()
        .ok_or(StageBuildError::DetectorNotConfigured)?;
    let detector = DetectorClient::new(detector_url, config.detector_request_timeout_secs)?;

    let (transform_command, validate_command) = if skip_externals {
        (None, None)
    } else {
        (
            config.transform_command.clone(),
            config.validate_command.clone(),
        )
    };

    let mut set = StageSet::new();
    set.register(
        StageId::Harvest,
        Box::new(HarvestStage::new(
            gateway,
            layout.clone(),
            channels,
            HarvestOptions::from_app_config(config),
        )),
    );
    set.register(
        StageId::LoadMessages,
        Box::new(LoadMessagesStage::new(pool.clone(), layout.clone())),
    );
    set.register(
        StageId::Detect,
        Box::new(DetectStage::new(
            detector,
            layout.clone(),
            ScanOptions::from_app_config(config),
        )),
    );
    set.register(
        StageId::LoadDetections,
        Box::new(LoadDetectionsStage::new(
            pool.clone(),
            layout,
            config.loader_batch_size,
        )),
    );
    set.register(
        StageId::Transform,
        Box::new(CommandStage::new(StageId::Transform, transform_command)),
    );
    set.register(
        StageId::Validate,
        Box::new(CommandStage::new(StageId::Validate, validate_command)),
    );
    Ok(set)
}
