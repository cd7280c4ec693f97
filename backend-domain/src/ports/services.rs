use async_trait::async_trait;

use crate::entities::{Parcel, RuntimeConfig, Station};
use crate::error::DomainError;

/// Proof-of-delivery attachments forwarded with a delivered notification.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeliveryProof {
    pub operator_id: String,
    pub delivered_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_ref: Option<String>,
}

/// One webhook delivery attempt, kept for the ops endpoints.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeliveryRecord {
    pub timestamp_ms: i64,
    pub tracking_number: String,
    pub status: String,
    pub attempts: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait DeliveryNotifier: Send + Sync {
    /// Fire-and-forget: spawns the webhook call with bounded retries.
    fn spawn_delivered(&self, config: RuntimeConfig, parcel: Parcel, proof: DeliveryProof);
    async fn deliveries(&self, limit: usize) -> Vec<DeliveryRecord>;
    async fn last_delivery(&self) -> Option<DeliveryRecord>;
}

#[async_trait]
pub trait StationDirectory: Send + Sync {
    async fn get(&self, station_id: &str) -> Result<Option<Station>, DomainError>;
    async fn all(&self) -> Result<Vec<Station>, DomainError>;
}
