use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entities::ManifestTotals;
use crate::value_objects::{OperationType, ParcelStatus};

/// Reference entity supplied by the station directory; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub capacity: Option<u64>,
}

/// Derived-on-read snapshot of one station. Consistent with the underlying
/// parcel/ledger/manifest state at the instant of the read.
#[derive(Debug, Clone, Serialize)]
pub struct StationSnapshot {
    pub station: Station,
    pub parcels_by_status: HashMap<ParcelStatus, u64>,
    pub operations_today: HashMap<OperationType, u64>,
    pub open_manifests: ManifestTotals,
    pub generated_at: i64,
}
