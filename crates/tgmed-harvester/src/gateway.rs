//! HTTP client for the Telegram MTProto gateway.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::HarvestError;
use crate::types::{ChannelInfo, GatewayMessage};

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    messages: Vec<Value>,
}

/// Client for the gateway bridge that fronts a logged-in Telegram session.
///
/// The gateway translates MTProto flood control into plain HTTP: a 429
/// with `Retry-After` is surfaced as [`HarvestError::FloodWait`] so the
/// harvest loop can honor it. 401/403 are fatal credential failures.
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl GatewayClient {
    /// Creates a client with the configured request timeout. `base_url`
    /// comes straight from configuration, which lets tests point it at a
    /// local mock server.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_token,
        })
    }

    /// Resolves a channel username to its identity (title included).
    ///
    /// # Errors
    ///
    /// - [`HarvestError::ChannelNotFound`] — gateway does not know the username.
    /// - [`HarvestError::Unauthorized`] — 401/403; fatal to the whole run.
    /// - [`HarvestError::Connect`] — gateway unreachable; fatal to the whole run.
    pub async fn resolve_channel(&self, username: &str) -> Result<ChannelInfo, HarvestError> {
        let url = format!("{}/channels/{}", self.base_url, bare(username));
        let response = self.send(&url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(HarvestError::ChannelNotFound {
                username: username.to_owned(),
            });
        }
        check_common_statuses(status, &url, &response)?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| HarvestError::Deserialize {
            context: format!("channel info for {username}"),
            source,
        })
    }

    /// Fetches one page of channel history, oldest-cursor style: messages
    /// strictly older than `offset_id` (0 means "from the newest"), at
    /// most `limit` of them. An empty page means the history is exhausted.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::FloodWait`] — 429; carries the server's requested wait.
    /// - [`HarvestError::Unauthorized`] / [`HarvestError::Connect`] — fatal.
    /// - [`HarvestError::UnexpectedStatus`] — any other non-2xx.
    /// - [`HarvestError::Deserialize`] — envelope is not valid JSON.
    pub async fn fetch_history_page(
        &self,
        username: &str,
        offset_id: i64,
        limit: u32,
    ) -> Result<Vec<GatewayMessage>, HarvestError> {
        let url = format!(
            "{}/channels/{}/messages?offset_id={offset_id}&limit={limit}",
            self.base_url,
            bare(username)
        );
        let response = self.send(&url).await?;
        check_common_statuses(response.status(), &url, &response)?;

        let body = response.text().await?;
        let envelope: HistoryEnvelope =
            serde_json::from_str(&body).map_err(|source| HarvestError::Deserialize {
                context: format!("history page for {username} at offset {offset_id}"),
                source,
            })?;

        let mut messages = Vec::with_capacity(envelope.messages.len());
        for raw in envelope.messages {
            match GatewayMessage::from_raw(raw) {
                Some(message) => messages.push(message),
                None => warn!(channel = username, "dropping history entry without numeric id"),
            }
        }
        Ok(messages)
    }

    /// Downloads the media payload attached to one message.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::NoMedia`] — 404; the message carries nothing downloadable.
    /// - [`HarvestError::FloodWait`] — media downloads are flood-controlled too.
    pub async fn download_media(
        &self,
        username: &str,
        message_id: i64,
    ) -> Result<Vec<u8>, HarvestError> {
        let url = format!(
            "{}/channels/{}/messages/{message_id}/media",
            self.base_url,
            bare(username)
        );
        let response = self.send(&url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(HarvestError::NoMedia {
                username: username.to_owned(),
                message_id,
            });
        }
        check_common_statuses(status, &url, &response)?;

        Ok(response.bytes().await?.to_vec())
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, HarvestError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        request.send().await.map_err(|source| {
            if source.is_connect() {
                HarvestError::Connect {
                    url: url.to_owned(),
                    source,
                }
            } else {
                HarvestError::Http(source)
            }
        })
    }
}

/// 429/401/403 and generic non-2xx mapping shared by every endpoint.
fn check_common_statuses(
    status: StatusCode,
    url: &str,
    response: &reqwest::Response,
) -> Result<(), HarvestError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let seconds = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(HarvestError::FloodWait { seconds });
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(HarvestError::Unauthorized {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(HarvestError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }
    Ok(())
}

fn bare(username: &str) -> &str {
    username.trim_start_matches('@')
}
