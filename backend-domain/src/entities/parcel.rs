use serde::{Deserialize, Serialize};

use crate::value_objects::{Money, ParcelStatus, Weight};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// A physical parcel. Mutated only through the state machine's transition
/// path; terminal parcels are retained for audit, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: String,
    pub tracking_number: String,
    pub sender: ContactInfo,
    pub receiver: ContactInfo,
    pub weight: Weight,
    pub declared_value: Money,
    pub cod_amount: Money,
    pub fragile: bool,
    pub signature_required: bool,
    pub status: ParcelStatus,
    pub station_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_bin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<String>,
    /// Optimistic-concurrency counter, bumped by the store on every write.
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Parcel {
    /// `manifest_id` must be set exactly while the parcel is attached to a
    /// manifest-bound status.
    pub fn manifest_link_consistent(&self) -> bool {
        match self.status {
            ParcelStatus::Manifested | ParcelStatus::OutForDelivery => self.manifest_id.is_some(),
            ParcelStatus::Created
            | ParcelStatus::InboundReceived
            | ParcelStatus::Sorting
            | ParcelStatus::Sorted
            | ParcelStatus::Cancelled => self.manifest_id.is_none(),
            // Delivered keeps its manifest link; failed/returned keep it only
            // when the exception happened after the manifest was finalized.
            ParcelStatus::Delivered | ParcelStatus::Failed | ParcelStatus::Returned => true,
        }
    }
}

/// Intake payload for one parcel. Weight is kilograms, amounts are in the
/// station's configured currency unless stated.
#[derive(Debug, Clone, Deserialize)]
pub struct ParcelIntake {
    pub tracking_number: String,
    pub sender: ContactInfo,
    pub receiver: ContactInfo,
    pub weight_kg: rust_decimal::Decimal,
    #[serde(default)]
    pub declared_value: Option<rust_decimal::Decimal>,
    #[serde(default)]
    pub cod_amount: Option<rust_decimal::Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub fragile: bool,
    #[serde(default)]
    pub signature_required: bool,
    pub station_id: String,
    #[serde(default)]
    pub route_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeEnvelope {
    #[serde(default)]
    pub parcels: Vec<ParcelIntake>,
}

/// Intake result for one parcel: the created record plus its bound QR code.
#[derive(Debug, Clone, Serialize)]
pub struct ParcelRegistration {
    pub parcel: Parcel,
    pub qr: crate::entities::QrCode,
}
