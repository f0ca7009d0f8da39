//! HTTP client for the YOLO inference service.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tgmed_core::records::BoundingBox;

use crate::DetectError;

/// One detected object as reported by the inference service.
#[derive(Debug, Clone, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f64,
    #[serde(default, rename = "box")]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Deserialize)]
struct DetectEnvelope {
    detections: Vec<Detection>,
}

/// Client for the detection service's `POST /detect` endpoint.
///
/// Image bytes go up as `application/octet-stream`; confidence and IoU
/// thresholds ride along as query parameters so the service applies the
/// same cutoffs for every caller of a given scan.
pub struct DetectorClient {
    client: Client,
    base_url: String,
}

impl DetectorClient {
    /// # Errors
    ///
    /// Returns [`DetectError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, DetectError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Runs inference on one image.
    ///
    /// # Errors
    ///
    /// - [`DetectError::UnexpectedStatus`] — any non-2xx response.
    /// - [`DetectError::Deserialize`] — response body is not the expected envelope.
    /// - [`DetectError::Http`] — network failure or timeout.
    pub async fn detect(
        &self,
        image_bytes: &[u8],
        confidence_threshold: f64,
        iou_threshold: f64,
    ) -> Result<Vec<Detection>, DetectError> {
        let url = format!(
            "{}/detect?confidence={confidence_threshold}&iou={iou_threshold}",
            self.base_url
        );
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let envelope: DetectEnvelope =
            serde_json::from_str(&body).map_err(|source| DetectError::Deserialize {
                context: "detection response".to_owned(),
                source,
            })?;
        Ok(envelope.detections)
    }
}
