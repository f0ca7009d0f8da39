use std::path::PathBuf;

/// Process-wide configuration, loaded once at startup and passed by reference
/// into each component. Components never read environment variables at call
/// time.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub gateway_base_url: String,
    pub gateway_api_token: Option<String>,
    pub detector_base_url: Option<String>,
    pub archive_root: PathBuf,
    pub channels_path: PathBuf,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub harvest_page_size: u32,
    pub harvest_page_delay_ms: u64,
    pub harvest_request_timeout_secs: u64,
    pub harvest_flood_wait_margin_secs: u64,
    pub harvest_max_flood_retries: u32,
    pub detector_confidence_threshold: f64,
    pub detector_iou_threshold: f64,
    pub detector_request_timeout_secs: u64,
    pub detector_max_concurrent_images: usize,
    pub loader_batch_size: usize,
    pub pipeline_cron: String,
    pub pipeline_utc_offset_hours: i32,
    pub transform_command: Option<String>,
    pub validate_command: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("gateway_base_url", &self.gateway_base_url)
            .field(
                "gateway_api_token",
                &self.gateway_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field("detector_base_url", &self.detector_base_url)
            .field("archive_root", &self.archive_root)
            .field("channels_path", &self.channels_path)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("harvest_page_size", &self.harvest_page_size)
            .field("harvest_page_delay_ms", &self.harvest_page_delay_ms)
            .field(
                "harvest_request_timeout_secs",
                &self.harvest_request_timeout_secs,
            )
            .field(
                "harvest_flood_wait_margin_secs",
                &self.harvest_flood_wait_margin_secs,
            )
            .field("harvest_max_flood_retries", &self.harvest_max_flood_retries)
            .field(
                "detector_confidence_threshold",
                &self.detector_confidence_threshold,
            )
            .field("detector_iou_threshold", &self.detector_iou_threshold)
            .field(
                "detector_request_timeout_secs",
                &self.detector_request_timeout_secs,
            )
            .field(
                "detector_max_concurrent_images",
                &self.detector_max_concurrent_images,
            )
            .field("loader_batch_size", &self.loader_batch_size)
            .field("pipeline_cron", &self.pipeline_cron)
            .field("pipeline_utc_offset_hours", &self.pipeline_utc_offset_hours)
            .field("transform_command", &self.transform_command)
            .field("validate_command", &self.validate_command)
            .finish()
    }
}
