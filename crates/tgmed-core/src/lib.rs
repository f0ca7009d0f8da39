//! Shared configuration and record types for the tgmed pipeline.

use thiserror::Error;

mod app_config;
pub mod channels;
mod config;
pub mod records;

pub use app_config::AppConfig;
pub use channels::{load_channels, ChannelConfig, ChannelsFile};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{channel_dir_name, DetectionRecord, HarvestedMessage};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read channels file {path}: {source}")]
    ChannelsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse channels file: {0}")]
    ChannelsFileParse(#[from] serde_yaml::Error),

    #[error("channels validation failed: {0}")]
    Validation(String),
}
