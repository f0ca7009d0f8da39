//! Write operations for the `raw.raw_telegram_messages` table.

use chrono::NaiveDate;
use sqlx::PgPool;

/// One archived message document ready for the warehouse.
#[derive(Debug, Clone)]
pub struct NewRawMessage {
    pub message_id: i64,
    pub channel_username: Option<String>,
    pub channel_title: Option<String>,
    pub scraped_date: NaiveDate,
    pub raw_json: serde_json::Value,
}

/// Insert a batch of raw messages, skipping any `message_id` the table
/// already holds.
///
/// Returns the number of rows actually inserted. Uses a single
/// `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT DO NOTHING` so the
/// whole batch lands in one round-trip and re-running a load over the
/// same archive is a no-op. Duplicate ids inside the batch itself are
/// collapsed by the same conflict clause.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails; a failed batch inserts
/// nothing (single-statement atomicity).
pub async fn insert_raw_messages(
    pool: &PgPool,
    messages: &[NewRawMessage],
) -> Result<u64, sqlx::Error> {
    if messages.is_empty() {
        return Ok(0);
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut message_ids: Vec<i64> = Vec::with_capacity(messages.len());
    let mut channel_usernames: Vec<Option<String>> = Vec::with_capacity(messages.len());
    let mut channel_titles: Vec<Option<String>> = Vec::with_capacity(messages.len());
    let mut scraped_dates: Vec<NaiveDate> = Vec::with_capacity(messages.len());
    let mut raw_jsons: Vec<serde_json::Value> = Vec::with_capacity(messages.len());

    for message in messages {
        message_ids.push(message.message_id);
        channel_usernames.push(message.channel_username.clone());
        channel_titles.push(message.channel_title.clone());
        scraped_dates.push(message.scraped_date);
        raw_jsons.push(message.raw_json.clone());
    }

    let rows_affected = sqlx::query(
        "INSERT INTO raw.raw_telegram_messages \
             (message_id, channel_username, channel_title, scraped_date, raw_json) \
         SELECT * FROM UNNEST(\
             $1::bigint[], $2::text[], $3::text[], $4::date[], $5::jsonb[]) \
         ON CONFLICT (message_id) DO NOTHING",
    )
    .bind(&message_ids)
    .bind(&channel_usernames)
    .bind(&channel_titles)
    .bind(&scraped_dates)
    .bind(&raw_jsons)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}
