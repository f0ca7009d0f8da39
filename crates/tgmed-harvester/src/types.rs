//! Typed views over the gateway's JSON responses.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Resolved channel identity from `GET /channels/{username}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    pub username: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Document,
}

/// Media attachment descriptor carried on a gateway message.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    pub kind: MediaKind,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// One message from a history page.
///
/// The gateway hands back whatever the Telegram API produced; only the
/// fields the harvester itself needs are lifted out, the full document
/// is kept for the archive.
#[derive(Debug, Clone)]
pub struct GatewayMessage {
    pub id: i64,
    pub media: Option<MediaInfo>,
    raw: Value,
}

impl GatewayMessage {
    /// Lifts the typed view out of a raw message document. Messages
    /// without a numeric `id` cannot be archived or paged past, so they
    /// yield `None`.
    pub fn from_raw(raw: Value) -> Option<Self> {
        let id = raw.get("id").and_then(Value::as_i64)?;
        let media = match raw.get("media") {
            None | Some(Value::Null) => None,
            Some(media_value) => match MediaInfo::deserialize(media_value) {
                Ok(info) => Some(info),
                Err(err) => {
                    warn!(message_id = id, error = %err, "unrecognized media descriptor on message");
                    None
                }
            },
        };
        Some(Self { id, media, raw })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifts_id_and_media_from_raw_document() {
        let message = GatewayMessage::from_raw(json!({
            "id": 42,
            "message": "amoxicillin 500mg available",
            "media": {"kind": "photo", "mime_type": "image/jpeg"}
        }))
        .expect("message with id");

        assert_eq!(message.id, 42);
        let media = message.media.as_ref().expect("media present");
        assert_eq!(media.kind, MediaKind::Photo);
        assert_eq!(media.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(message.raw()["message"], "amoxicillin 500mg available");
    }

    #[test]
    fn message_without_id_is_rejected() {
        assert!(GatewayMessage::from_raw(json!({"message": "no id"})).is_none());
        assert!(GatewayMessage::from_raw(json!({"id": "not a number"})).is_none());
    }

    #[test]
    fn null_or_malformed_media_becomes_none() {
        let null_media =
            GatewayMessage::from_raw(json!({"id": 1, "media": null})).expect("message");
        assert!(null_media.media.is_none());

        let bad_media = GatewayMessage::from_raw(json!({"id": 2, "media": {"kind": "sticker"}}))
            .expect("message");
        assert!(bad_media.media.is_none());
    }
}
