use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::warn;

use backend_domain::ports::{DeliveryNotifier, DeliveryProof, DeliveryRecord};
use backend_domain::utils::current_millis;
use backend_domain::{Parcel, RuntimeConfig};

const MAX_ATTEMPTS: u8 = 3;
const LOG_CAPACITY: usize = 200;

/// Proof-of-delivery webhook notifier. Calls are spawned off the scan path;
/// each outcome lands in a bounded in-memory log served by the ops endpoints.
#[derive(Default)]
pub struct WebhookDeliveryNotifier {
    log: Arc<Mutex<VecDeque<DeliveryRecord>>>,
}

impl WebhookDeliveryNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryNotifier for WebhookDeliveryNotifier {
    fn spawn_delivered(&self, config: RuntimeConfig, parcel: Parcel, proof: DeliveryProof) {
        let Some(url) = config.pod_webhook_url.clone() else {
            return;
        };
        let log = self.log.clone();
        tokio::spawn(async move {
            let record = send_with_retries(&config, &url, &parcel, &proof).await;
            if let Some(error) = &record.error {
                warn!(tracking = %record.tracking_number, "pod webhook failed: {}", error);
            }
            let mut log = log.lock().await;
            if log.len() == LOG_CAPACITY {
                log.pop_back();
            }
            log.push_front(record);
        });
    }

    async fn deliveries(&self, limit: usize) -> Vec<DeliveryRecord> {
        let log = self.log.lock().await;
        log.iter().take(limit).cloned().collect()
    }

    async fn last_delivery(&self) -> Option<DeliveryRecord> {
        let log = self.log.lock().await;
        log.front().cloned()
    }
}

async fn send_with_retries(
    config: &RuntimeConfig,
    url: &str,
    parcel: &Parcel,
    proof: &DeliveryProof,
) -> DeliveryRecord {
    let payload = build_payload(config, parcel, proof);
    let mut last_error = None;
    let mut attempts = 0;
    while attempts < MAX_ATTEMPTS {
        attempts += 1;
        match post_once(config, url, &payload).await {
            Ok(()) => {
                return DeliveryRecord {
                    timestamp_ms: current_millis(),
                    tracking_number: parcel.tracking_number.clone(),
                    status: "sent".to_string(),
                    attempts,
                    error: None,
                }
            }
            Err(err) => {
                last_error = Some(err.to_string());
                tokio::time::sleep(Duration::from_millis(250 * u64::from(attempts))).await;
            }
        }
    }
    DeliveryRecord {
        timestamp_ms: current_millis(),
        tracking_number: parcel.tracking_number.clone(),
        status: "failed".to_string(),
        attempts,
        error: last_error,
    }
}

async fn post_once(config: &RuntimeConfig, url: &str, payload: &str) -> anyhow::Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
        .build()?;
    client
        .post(url)
        .header("Content-Type", "application/json")
        .body(payload.to_string())
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

fn build_payload(config: &RuntimeConfig, parcel: &Parcel, proof: &DeliveryProof) -> String {
    match &config.pod_webhook_template {
        Some(template) => template
            .replace("{tracking}", &parcel.tracking_number)
            .replace("{receiver}", &parcel.receiver.name)
            .replace("{operator}", &proof.operator_id)
            .replace("{delivered_at}", &proof.delivered_at.to_string()),
        None => json!({
            "event": "parcel.delivered",
            "tracking_number": parcel.tracking_number,
            "station_id": parcel.station_id,
            "receiver": parcel.receiver.name,
            "proof": proof,
        })
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::value_objects::{Currency, Money, ParcelStatus, Weight};
    use backend_domain::ContactInfo;

    fn sample_parcel() -> Parcel {
        Parcel {
            id: "p1".to_string(),
            tracking_number: "BRT-1".to_string(),
            sender: ContactInfo {
                name: "sender".to_string(),
                phone: "09".to_string(),
                address: "a".to_string(),
            },
            receiver: ContactInfo {
                name: "Daw Mya".to_string(),
                phone: "09".to_string(),
                address: "b".to_string(),
            },
            weight: Weight::ZERO,
            declared_value: Money::zero(Currency::Mmk),
            cod_amount: Money::zero(Currency::Mmk),
            fragile: false,
            signature_required: false,
            status: ParcelStatus::Delivered,
            station_id: "ST-01".to_string(),
            sort_bin: None,
            route_code: None,
            manifest_id: Some("m1".to_string()),
            version: 7,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn template_placeholders_are_substituted() {
        let mut config = RuntimeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            api_token: None,
            data_path: String::new(),
            stations_path: String::new(),
            default_currency: Currency::Mmk,
            scan_dedup_window_seconds: 10,
            stale_retry_attempts: 3,
            stale_retry_delay_ms: 25,
            pod_webhook_url: Some("http://example.invalid/pod".to_string()),
            pod_webhook_template: Some(r#"{"msg":"{tracking} to {receiver}"}"#.to_string()),
            max_body_bytes: 1024,
            request_timeout_seconds: 5,
        };
        let proof = DeliveryProof {
            operator_id: "worker-1".to_string(),
            delivered_at: 42,
            photo_ref: None,
            signature_ref: None,
        };
        let payload = build_payload(&config, &sample_parcel(), &proof);
        assert_eq!(payload, r#"{"msg":"BRT-1 to Daw Mya"}"#);

        config.pod_webhook_template = None;
        let payload = build_payload(&config, &sample_parcel(), &proof);
        assert!(payload.contains("\"tracking_number\":\"BRT-1\""));
    }
}
