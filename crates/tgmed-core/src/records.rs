use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Directory name for a channel inside a date partition: the channel title
/// with spaces replaced by underscores. Every component that touches the
/// archive derives channel directories through this function.
#[must_use]
pub fn channel_dir_name(channel_title: &str) -> String {
    channel_title.replace(' ', "_")
}

/// A harvested message as written to the archive: the full source-provided
/// document with `channel_username` and `channel_title` injected at the top
/// level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HarvestedMessage {
    payload: Value,
}

impl HarvestedMessage {
    /// Wraps a raw gateway message, injecting the channel identity fields.
    ///
    /// Non-object payloads are wrapped under a `"raw"` key so the channel
    /// fields can still be injected; the gateway contract makes this a
    /// pathological case rather than an expected one.
    #[must_use]
    pub fn new(raw: Value, channel_username: &str, channel_title: &str) -> Self {
        let mut payload = match raw {
            Value::Object(map) => Value::Object(map),
            other => serde_json::json!({ "raw": other }),
        };
        if let Value::Object(map) = &mut payload {
            map.insert(
                "channel_username".to_string(),
                Value::String(channel_username.to_string()),
            );
            map.insert(
                "channel_title".to_string(),
                Value::String(channel_title.to_string()),
            );
        }
        Self { payload }
    }

    /// The source-assigned message id, read from the top-level `"id"` key.
    #[must_use]
    pub fn message_id(&self) -> Option<i64> {
        self.payload.get("id").and_then(Value::as_i64)
    }

    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// One detected object instance, appended as a single line to the detection
/// log. Field names match the on-disk JSONL contract; `timestamp` maps to the
/// warehouse `detection_timestamp` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub message_id: i64,
    pub image_path: String,
    pub scraped_date: NaiveDate,
    pub channel_name: String,
    pub detected_object_class: String,
    pub confidence_score: f64,
    pub timestamp: DateTime<Utc>,
    /// Model-reported box corners, preserved for the raw warehouse column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}
