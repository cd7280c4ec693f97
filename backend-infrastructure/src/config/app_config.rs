use std::env;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use backend_domain::value_objects::Currency;
use backend_domain::RuntimeConfig;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub data_path: String,
    pub stations_path: String,
    pub default_currency: String,
    pub scan_dedup_window_seconds: u64,
    pub stale_retry_attempts: u32,
    pub stale_retry_delay_ms: u64,
    pub pod_webhook_url: Option<String>,
    pub pod_webhook_template: Option<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3310".to_string(),
            api_token: None,
            data_path: "./depot.redb".to_string(),
            stations_path: "./stations.yaml".to_string(),
            default_currency: "MMK".to_string(),
            scan_dedup_window_seconds: 10,
            stale_retry_attempts: 3,
            stale_retry_delay_ms: 25,
            pod_webhook_url: None,
            pod_webhook_template: None,
            max_body_bytes: 8 * 1024 * 1024,
            request_timeout_seconds: 15,
        }
    }
}

impl AppConfig {
    /// Loads from an explicit path when given, otherwise from `DEPOT_CONFIG`
    /// or `./config.toml`.
    pub async fn load(path_override: Option<&str>) -> Result<Self> {
        let path = match path_override {
            Some(explicit) => explicit.to_string(),
            None => env::var("DEPOT_CONFIG").unwrap_or_else(|_| "./config.toml".to_string()),
        };
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        if !file_path.exists() {
            warn!("config file {} not found, using defaults", path);
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config.resolve_paths(base_dir);
            config.normalize();
            config.validate()?;
            return Ok(config);
        }
        let content = fs::read_to_string(file_path).await?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        if let Some(api_token) = &self.api_token {
            if api_token.trim().is_empty() {
                self.api_token = None;
            }
        }
        if let Some(url) = &self.pod_webhook_url {
            if url.trim().is_empty() {
                self.pod_webhook_url = None;
            }
        }
        if let Some(template) = &self.pod_webhook_template {
            if template.trim().is_empty() {
                self.pod_webhook_template = None;
            }
        }
        self.default_currency = self.default_currency.trim().to_uppercase();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.data_path = resolve_path(base, &self.data_path);
        self.stations_path = resolve_path(base, &self.stations_path);
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.data_path.trim().is_empty() {
            return Err(anyhow!("data_path must not be empty"));
        }
        if self.stations_path.trim().is_empty() {
            return Err(anyhow!("stations_path must not be empty"));
        }
        Currency::from_str(&self.default_currency)
            .map_err(|err| anyhow!("invalid default_currency: {}", err))?;
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.scan_dedup_window_seconds == 0 {
            return Err(anyhow!("scan_dedup_window_seconds must be greater than 0"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> Result<RuntimeConfig> {
        Ok(RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            data_path: self.data_path.clone(),
            stations_path: self.stations_path.clone(),
            default_currency: Currency::from_str(&self.default_currency)
                .map_err(|err| anyhow!("invalid default_currency: {}", err))?,
            scan_dedup_window_seconds: self.scan_dedup_window_seconds,
            stale_retry_attempts: self.stale_retry_attempts,
            stale_retry_delay_ms: self.stale_retry_delay_ms,
            pod_webhook_url: self.pod_webhook_url.clone(),
            pod_webhook_template: self.pod_webhook_template.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("DEPOT_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("DEPOT_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("DEPOT_DATA_PATH") {
            self.data_path = value;
        }
        if let Ok(value) = env::var("DEPOT_STATIONS_PATH") {
            self.stations_path = value;
        }
        if let Ok(value) = env::var("DEPOT_DEFAULT_CURRENCY") {
            self.default_currency = value;
        }
        if let Ok(value) = env::var("DEPOT_SCAN_DEDUP_WINDOW_SECONDS") {
            self.scan_dedup_window_seconds =
                value.parse().unwrap_or(self.scan_dedup_window_seconds);
        }
        if let Ok(value) = env::var("DEPOT_STALE_RETRY_ATTEMPTS") {
            self.stale_retry_attempts = value.parse().unwrap_or(self.stale_retry_attempts);
        }
        if let Ok(value) = env::var("DEPOT_STALE_RETRY_DELAY_MS") {
            self.stale_retry_delay_ms = value.parse().unwrap_or(self.stale_retry_delay_ms);
        }
        if let Ok(value) = env::var("DEPOT_POD_WEBHOOK_URL") {
            self.pod_webhook_url = Some(value);
        }
        if let Ok(value) = env::var("DEPOT_POD_WEBHOOK_TEMPLATE") {
            self.pod_webhook_template = Some(value);
        }
        if let Ok(value) = env::var("DEPOT_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("DEPOT_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
