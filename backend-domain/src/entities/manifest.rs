use serde::{Deserialize, Serialize};

use crate::value_objects::{ManifestStatus, ManifestType, Money, Weight};

/// A batch of parcels grouped for one transport leg. Totals are maintained by
/// the store in the same transaction as every item change, so they always
/// equal the sum over the attached items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub manifest_number: String,
    pub manifest_type: ManifestType,
    pub origin_station_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_station_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    pub status: ManifestStatus,
    pub total_parcels: u64,
    pub total_weight: Weight,
    pub total_cod: Money,
    pub created_by: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatched_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl Manifest {
    pub fn stamp_stage(&mut self, stage: ManifestStatus, now_ms: i64) {
        match stage {
            ManifestStatus::Draft => {}
            ManifestStatus::Finalized => self.finalized_at = Some(now_ms),
            ManifestStatus::Dispatched => self.dispatched_at = Some(now_ms),
            ManifestStatus::Arrived => self.arrived_at = Some(now_ms),
            ManifestStatus::Completed => self.completed_at = Some(now_ms),
        }
        self.status = stage;
    }
}

/// Membership row; `(manifest_id, parcel_id)` is unique and a parcel belongs
/// to at most one active manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestItem {
    pub manifest_id: String,
    pub parcel_id: String,
    pub tracking_number: String,
    pub scanned_at: i64,
    pub scanned_by: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestCreate {
    pub manifest_type: ManifestType,
    pub origin_station_id: String,
    #[serde(default)]
    pub destination_station_id: Option<String>,
    #[serde(default)]
    pub vehicle_plate: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_phone: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestAddParcel {
    /// Tracking number or a bound QR code string.
    pub parcel: String,
    pub scanned_by: String,
}

/// Manifest plus its membership rows, as served by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestDetail {
    pub manifest: Manifest,
    pub items: Vec<ManifestItem>,
}

/// Create result: the manifest and the QR code bound to its number.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestCreated {
    pub manifest: Manifest,
    pub qr: crate::entities::QrCode,
}

/// Aggregate over a station's open (non-completed) manifests, for the stats
/// view.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestTotals {
    pub manifests: u64,
    pub parcels: u64,
    pub weight: Weight,
    pub cod: Money,
}
