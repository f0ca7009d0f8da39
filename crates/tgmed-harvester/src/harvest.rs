//! Sequential channel harvest loop.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tgmed_archive::ArchiveLayout;
use tgmed_core::channels::ChannelConfig;
use tgmed_core::records::HarvestedMessage;
use tgmed_core::AppConfig;
use tracing::{debug, error, info, warn};

use crate::error::HarvestError;
use crate::gateway::GatewayClient;
use crate::media::media_file_name;

/// Tuning knobs for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub page_size: u32,
    /// Politeness delay between history pages.
    pub page_delay: Duration,
    /// Safety margin added on top of every server-requested flood wait.
    pub flood_wait_margin: Duration,
    /// Flood-wait retries allowed per channel before giving up on it.
    pub max_flood_retries: u32,
}

impl HarvestOptions {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.harvest_page_size,
            page_delay: Duration::from_millis(config.harvest_page_delay_ms),
            flood_wait_margin: Duration::from_secs(config.harvest_flood_wait_margin_secs),
            max_flood_retries: config.harvest_max_flood_retries,
        }
    }
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_delay: Duration::from_millis(1000),
            flood_wait_margin: Duration::from_secs(5),
            max_flood_retries: 3,
        }
    }
}

/// Per-channel counters for one run.
#[derive(Debug, Clone, Default)]
pub struct ChannelReport {
    pub username: String,
    pub title: String,
    pub messages_archived: u64,
    pub media_downloaded: u64,
    pub write_failures: u64,
    pub media_failures: u64,
    /// Set when the channel was abandoned mid-harvest; counters above
    /// still reflect the work that completed before the failure.
    pub failed: Option<String>,
}

impl ChannelReport {
    fn new(username: &str) -> Self {
        Self {
            username: username.to_owned(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    pub channels: Vec<ChannelReport>,
}

impl HarvestReport {
    pub fn total_messages_archived(&self) -> u64 {
        self.channels.iter().map(|c| c.messages_archived).sum()
    }

    pub fn total_media_downloaded(&self) -> u64 {
        self.channels.iter().map(|c| c.media_downloaded).sum()
    }

    pub fn failed_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.failed.is_some()).count()
    }

    pub fn all_channels_failed(&self) -> bool {
        !self.channels.is_empty() && self.channels.iter().all(|c| c.failed.is_some())
    }
}

/// Harvests every configured channel in order, one at a time.
///
/// A channel that fails (resolution error, flood budget exhausted,
/// unexpected status) is recorded in the report and the run moves on to
/// the next channel. Credential and connectivity failures abort the
/// whole run instead, since every remaining channel would fail the same
/// way.
///
/// # Errors
///
/// Returns the underlying [`HarvestError`] only for fatal failures
/// ([`HarvestError::is_fatal`]); per-channel problems end up in the
/// report, not the error channel.
pub async fn harvest_channels(
    client: &GatewayClient,
    layout: &ArchiveLayout,
    channels: &[ChannelConfig],
    opts: &HarvestOptions,
) -> Result<HarvestReport, HarvestError> {
    let capture_date = Utc::now().date_naive();
    let mut report = HarvestReport::default();

    for channel in channels {
        let username = channel.normalized_username();
        let mut channel_report = ChannelReport::new(&username);
        match harvest_channel(client, layout, channel, opts, capture_date, &mut channel_report)
            .await
        {
            Ok(()) => info!(
                channel = %username,
                archived = channel_report.messages_archived,
                media = channel_report.media_downloaded,
                "channel harvest complete"
            ),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                error!(channel = %username, error = %err, "channel harvest failed");
                channel_report.failed = Some(err.to_string());
            }
        }
        report.channels.push(channel_report);
    }

    Ok(report)
}

async fn harvest_channel(
    client: &GatewayClient,
    layout: &ArchiveLayout,
    channel: &ChannelConfig,
    opts: &HarvestOptions,
    capture_date: NaiveDate,
    report: &mut ChannelReport,
) -> Result<(), HarvestError> {
    let username = channel.normalized_username();
    let info = client.resolve_channel(&username).await?;
    report.title.clone_from(&info.title);
    info!(channel = %username, title = %info.title, media_enabled = channel.media, "harvesting channel");

    let mut offset_id = 0i64;
    let mut flood_retries = 0u32;

    loop {
        let messages = match client
            .fetch_history_page(&username, offset_id, opts.page_size)
            .await
        {
            Ok(messages) => {
                flood_retries = 0;
                messages
            }
            Err(HarvestError::FloodWait { seconds }) => {
                flood_retries += 1;
                if flood_retries > opts.max_flood_retries {
                    return Err(HarvestError::FloodRetriesExhausted {
                        username,
                        retries: opts.max_flood_retries,
                    });
                }
                let wait = Duration::from_secs(seconds) + opts.flood_wait_margin;
                warn!(
                    channel = %username,
                    requested_secs = seconds,
                    wait_secs = wait.as_secs(),
                    attempt = flood_retries,
                    "flood wait requested, sleeping before retrying page"
                );
                tokio::time::sleep(wait).await;
                continue;
            }
            Err(err) => return Err(err),
        };

        // An empty page means the history behind the cursor is exhausted.
        let Some(last) = messages.last() else {
            break;
        };
        offset_id = last.id;

        for message in messages {
            let message_id = message.id;
            let media = message.media.clone();
            let harvested = HarvestedMessage::new(message.into_raw(), &username, &info.title);

            match layout.write_message(capture_date, &info.title, &harvested).await {
                Ok(path) => {
                    debug!(channel = %username, message_id, path = %path.display(), "archived message");
                    report.messages_archived += 1;
                }
                Err(err) => {
                    warn!(channel = %username, message_id, error = %err, "failed to archive message");
                    report.write_failures += 1;
                }
            }

            if let (true, Some(media)) = (channel.media, media) {
                let file_name = media_file_name(&info.title, message_id, &media);
                match download_with_flood_retry(client, &username, message_id, opts).await {
                    Ok(bytes) => {
                        match layout
                            .write_media(capture_date, &info.title, &file_name, &bytes)
                            .await
                        {
                            Ok(path) => {
                                debug!(channel = %username, message_id, path = %path.display(), "archived media");
                                report.media_downloaded += 1;
                            }
                            Err(err) => {
                                warn!(channel = %username, message_id, error = %err, "failed to write media file");
                                report.media_failures += 1;
                            }
                        }
                    }
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!(channel = %username, message_id, error = %err, "failed to download media");
                        report.media_failures += 1;
                    }
                }
            }
        }

        if !opts.page_delay.is_zero() {
            tokio::time::sleep(jittered(opts.page_delay)).await;
        }
    }

    Ok(())
}

/// Politeness delay with ±25% jitter.
fn jittered(delay: Duration) -> Duration {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let millis = (delay.as_millis() as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(millis)
}

/// One flood-wait retry for a media download; a second 429 is handed
/// back to the caller as an ordinary failure.
async fn download_with_flood_retry(
    client: &GatewayClient,
    username: &str,
    message_id: i64,
    opts: &HarvestOptions,
) -> Result<Vec<u8>, HarvestError> {
    match client.download_media(username, message_id).await {
        Err(HarvestError::FloodWait { seconds }) => {
            let wait = Duration::from_secs(seconds) + opts.flood_wait_margin;
            warn!(
                channel = username,
                message_id,
                wait_secs = wait.as_secs(),
                "flood wait on media download, retrying once"
            );
            tokio::time::sleep(wait).await;
            client.download_media(username, message_id).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_totals_sum_across_channels() {
        let report = HarvestReport {
            channels: vec![
                ChannelReport {
                    username: "chemed123".to_owned(),
                    messages_archived: 5,
                    media_downloaded: 2,
                    ..ChannelReport::default()
                },
                ChannelReport {
                    username: "lobelia4cosmetics".to_owned(),
                    messages_archived: 3,
                    media_downloaded: 1,
                    failed: Some("flood wait retries exhausted".to_owned()),
                    ..ChannelReport::default()
                },
            ],
        };

        assert_eq!(report.total_messages_archived(), 8);
        assert_eq!(report.total_media_downloaded(), 3);
        assert_eq!(report.failed_channels(), 1);
        assert!(!report.all_channels_failed());
    }

    #[test]
    fn all_failed_requires_at_least_one_channel() {
        assert!(!HarvestReport::default().all_channels_failed());

        let report = HarvestReport {
            channels: vec![ChannelReport {
                username: "chemed123".to_owned(),
                failed: Some("boom".to_owned()),
                ..ChannelReport::default()
            }],
        };
        assert!(report.all_channels_failed());
    }
}
