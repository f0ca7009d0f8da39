//! Rate-limit-aware harvester for Telegram channel feeds.
//!
//! Talks to an MTProto HTTP gateway (a thin bridge in front of a logged-in
//! Telegram session), pages each configured channel's history oldest-cursor
//! style, and lands every message verbatim in the date-partitioned archive.
//! Media is downloaded only for channels explicitly marked for it.

mod error;
mod gateway;
mod harvest;
mod media;
mod types;

pub use error::HarvestError;
pub use gateway::GatewayClient;
pub use harvest::{harvest_channels, ChannelReport, HarvestOptions, HarvestReport};
pub use media::media_file_name;
pub use types::{ChannelInfo, GatewayMessage, MediaInfo, MediaKind};
