use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One harvested channel from `config/channels.yaml`.
///
/// `media: true` marks the channel as part of the media-download subset:
/// attached photos and documents are fetched into the image partition in
/// addition to the message records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub username: String,
    /// Optional human-readable title used before the source entity resolves.
    pub title_hint: Option<String>,
    #[serde(default)]
    pub media: bool,
}

impl ChannelConfig {
    /// Channel username without a leading `@`, lowercased, for dedup checks.
    #[must_use]
    pub fn normalized_username(&self) -> String {
        self.username.trim_start_matches('@').to_lowercase()
    }
}

#[derive(Debug, Deserialize)]
pub struct ChannelsFile {
    pub channels: Vec<ChannelConfig>,
}

impl ChannelsFile {
    /// Channels in the media-download subset.
    #[must_use]
    pub fn media_channels(&self) -> Vec<&ChannelConfig> {
        self.channels.iter().filter(|c| c.media).collect()
    }
}

/// Load and validate the channel registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_channels(path: &Path) -> Result<ChannelsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ChannelsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let channels_file: ChannelsFile = serde_yaml::from_str(&content)?;

    validate_channels(&channels_file)?;

    Ok(channels_file)
}

fn validate_channels(channels_file: &ChannelsFile) -> Result<(), ConfigError> {
    if channels_file.channels.is_empty() {
        return Err(ConfigError::Validation(
            "channel list must be non-empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for channel in &channels_file.channels {
        let normalized = channel.normalized_username();
        if normalized.is_empty() {
            return Err(ConfigError::Validation(
                "channel username must be non-empty".to_string(),
            ));
        }
        if !seen.insert(normalized.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate channel username: '{}'",
                channel.username
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(username: &str, media: bool) -> ChannelConfig {
        ChannelConfig {
            username: username.to_string(),
            title_hint: None,
            media,
        }
    }

    #[test]
    fn normalized_username_strips_at_and_lowercases() {
        assert_eq!(
            channel("@CheMed123", false).normalized_username(),
            "chemed123"
        );
        assert_eq!(channel("tikvahpharma", false).normalized_username(), "tikvahpharma");
    }

    #[test]
    fn media_channels_returns_only_flagged_entries() {
        let file = ChannelsFile {
            channels: vec![
                channel("@CheMed123", true),
                channel("@tikvahpharma", false),
                channel("@lobelia4cosmetics", true),
            ],
        };
        let media: Vec<&str> = file
            .media_channels()
            .iter()
            .map(|c| c.username.as_str())
            .collect();
        assert_eq!(media, vec!["@CheMed123", "@lobelia4cosmetics"]);
    }

    #[test]
    fn validate_rejects_empty_list() {
        let file = ChannelsFile { channels: vec![] };
        let err = validate_channels(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_empty_username() {
        let file = ChannelsFile {
            channels: vec![channel("@", false)],
        };
        let err = validate_channels(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_ignoring_case_and_at() {
        let file = ChannelsFile {
            channels: vec![channel("@CheMed123", true), channel("chemed123", false)],
        };
        let err = validate_channels(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate channel username"));
    }

    #[test]
    fn validate_accepts_distinct_channels() {
        let file = ChannelsFile {
            channels: vec![channel("@CheMed123", true), channel("@tenamereja", false)],
        };
        assert!(validate_channels(&file).is_ok());
    }

    #[test]
    fn parses_yaml_with_defaulted_media_flag() {
        let yaml = "channels:\n  - username: \"@CheMed123\"\n    media: true\n  - username: \"@tenamereja\"\n";
        let file: ChannelsFile = serde_yaml::from_str(yaml).unwrap();
        assert!(file.channels[0].media);
        assert!(!file.channels[1].media);
    }
}
