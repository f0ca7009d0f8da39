//! `load messages` / `load detections` — warehouse loaders.

use clap::Subcommand;
use tgmed_archive::ArchiveLayout;
use tgmed_core::AppConfig;
use tgmed_loader::{load_detections, load_messages};

#[derive(Debug, Subcommand)]
pub(crate) enum LoadCommands {
    /// Load archived message files into raw.raw_telegram_messages
    Messages,
    /// Load the detection log into raw.raw_yolo_detections
    Detections,
}

pub(crate) async fn run(config: &AppConfig, command: LoadCommands) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    let layout = ArchiveLayout::new(&config.archive_root);

    let summary = match command {
        LoadCommands::Messages => load_messages(&pool, &layout).await?,
        LoadCommands::Detections => {
            load_detections(&pool, &layout, config.loader_batch_size).await?
        }
    };

    println!(
        "{} records seen; {} loaded ({} new rows); {} skipped; {} lost to failed batches",
        summary.records_seen,
        summary.records_loaded,
        summary.rows_inserted,
        summary.records_skipped,
        summary.records_failed
    );
    if summary.partitions_skipped > 0 {
        println!(
            "{} partition directories ignored (names did not parse as dates)",
            summary.partitions_skipped
        );
    }
    if summary.has_failures() {
        anyhow::bail!("{} batch(es) failed to load", summary.failed_batches);
    }
    Ok(())
}
