//! `harvest` — pull every configured channel into the raw archive.

use tgmed_archive::ArchiveLayout;
use tgmed_core::{load_channels, AppConfig};
use tgmed_harvester::{harvest_channels, GatewayClient, HarvestOptions};

pub(crate) async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let layout = ArchiveLayout::new(&config.archive_root);
    let channels = load_channels(&config.channels_path)?.channels;
    let client = GatewayClient::new(
        &config.gateway_base_url,
        config.gateway_api_token.clone(),
        config.harvest_request_timeout_secs,
    )?;
    let options = HarvestOptions::from_app_config(config);

    let report = harvest_channels(&client, &layout, &channels, &options).await?;

    for channel in &report.channels {
        match &channel.failed {
            Some(reason) => println!(
                "{}: failed after {} messages ({reason})",
                channel.username, channel.messages_archived
            ),
            None => println!(
                "{}: {} messages, {} media files",
                channel.username, channel.messages_archived, channel.media_downloaded
            ),
        }
    }
    println!(
        "archived {} messages and {} media files across {} channels",
        report.total_messages_archived(),
        report.total_media_downloaded(),
        report.channels.len()
    );

    if report.all_channels_failed() {
        anyhow::bail!("all {} channels failed to harvest", report.channels.len());
    }
    Ok(())
}
