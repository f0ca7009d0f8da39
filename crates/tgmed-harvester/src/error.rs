use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to reach gateway at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("gateway rejected credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("flood wait requested by gateway: {seconds}s")]
    FloodWait { seconds: u64 },

    #[error("flood wait retries exhausted for {username} after {retries} attempts")]
    FloodRetriesExhausted { username: String, retries: u32 },

    #[error("channel not found: {username}")]
    ChannelNotFound { username: String },

    #[error("message {message_id} in {username} has no downloadable media")]
    NoMedia { username: String, message_id: i64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Archive(#[from] tgmed_archive::ArchiveError),
}

impl HarvestError {
    /// Failures that invalidate the whole run, not just one channel.
    /// Credentials and reachability do not improve by moving on to the
    /// next channel.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::Unauthorized { .. } | HarvestError::Connect { .. }
        )
    }
}
