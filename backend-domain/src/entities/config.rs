use crate::value_objects::Currency;

/// Validated runtime configuration handed to every layer.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub data_path: String,
    pub stations_path: String,
    pub default_currency: Currency,
    /// Repeat scans of the same (code, target) inside this window are
    /// absorbed as duplicates.
    pub scan_dedup_window_seconds: u64,
    pub stale_retry_attempts: u32,
    pub stale_retry_delay_ms: u64,
    pub pod_webhook_url: Option<String>,
    pub pod_webhook_template: Option<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}
