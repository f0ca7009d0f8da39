//! Write operations for the `raw.raw_yolo_detections` table.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

/// One detection-log line ready for the warehouse.
#[derive(Debug, Clone)]
pub struct NewRawDetection {
    pub message_id: i64,
    pub image_path: String,
    pub scraped_date: NaiveDate,
    pub channel_name: Option<String>,
    pub detected_object_class: String,
    /// Bound to the `NUMERIC(5,4)` column.
    pub confidence_score: Decimal,
    pub detection_timestamp: DateTime<Utc>,
    pub raw_detection_json: serde_json::Value,
}

/// Insert a batch of detections.
///
/// The table is append-only with no natural key (one image can yield
/// many detections of the same class), so this is a straight multi-row
/// insert. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails; a failed batch inserts
/// nothing (single-statement atomicity).
pub async fn insert_raw_detections(
    pool: &PgPool,
    detections: &[NewRawDetection],
) -> Result<u64, sqlx::Error> {
    if detections.is_empty() {
        return Ok(0);
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut message_ids: Vec<i64> = Vec::with_capacity(detections.len());
    let mut image_paths: Vec<String> = Vec::with_capacity(detections.len());
    let mut scraped_dates: Vec<NaiveDate> = Vec::with_capacity(detections.len());
    let mut channel_names: Vec<Option<String>> = Vec::with_capacity(detections.len());
    let mut classes: Vec<String> = Vec::with_capacity(detections.len());
    let mut confidences: Vec<Decimal> = Vec::with_capacity(detections.len());
    let mut timestamps: Vec<DateTime<Utc>> = Vec::with_capacity(detections.len());
    let mut raw_jsons: Vec<serde_json::Value> = Vec::with_capacity(detections.len());

    for detection in detections {
        message_ids.push(detection.message_id);
        image_paths.push(detection.image_path.clone());
        scraped_dates.push(detection.scraped_date);
        channel_names.push(detection.channel_name.clone());
        classes.push(detection.detected_object_class.clone());
        confidences.push(detection.confidence_score);
        timestamps.push(detection.detection_timestamp);
        raw_jsons.push(detection.raw_detection_json.clone());
    }

    let rows_affected = sqlx::query(
        "INSERT INTO raw.raw_yolo_detections \
             (message_id, image_path, scraped_date, channel_name, \
              detected_object_class, confidence_score, detection_timestamp, \
              raw_detection_json) \
         SELECT * FROM UNNEST(\
             $1::bigint[], $2::text[], $3::date[], $4::text[], \
             $5::text[], $6::numeric[], $7::timestamptz[], $8::jsonb[])",
    )
    .bind(&message_ids)
    .bind(&image_paths)
    .bind(&scraped_dates)
    .bind(&channel_names)
    .bind(&classes)
    .bind(&confidences)
    .bind(&timestamps)
    .bind(&raw_jsons)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}
