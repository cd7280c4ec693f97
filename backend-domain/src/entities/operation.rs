use serde::{Deserialize, Serialize};

use crate::value_objects::{OperationType, ParcelStatus, ScanMethod};

/// One immutable audit-ledger entry. `seq` is assigned by the store inside the
/// same transaction that applies the parcel transition; `from_status` always
/// equals the parcel status the transition was computed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    #[serde(default)]
    pub seq: u64,
    pub operation_type: OperationType,
    pub parcel_id: String,
    pub tracking_number: String,
    pub station_id: String,
    pub operator_id: String,
    pub scan_method: ScanMethod,
    pub from_status: ParcelStatus,
    pub to_status: ParcelStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_bin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_ref: Option<String>,
    pub created_at: i64,
}

/// Ledger query filter; `date` is a `YYYY-MM-DD` local day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationQuery {
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Inbound scan event, the primary write path of the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub code: String,
    pub operation_type: OperationType,
    pub station_id: String,
    pub operator_id: String,
    pub scan_method: ScanMethod,
    /// Explicit target status; omitted for the default per-operation target.
    /// Required for exception flows (`failed`, `returned`, `cancelled`).
    #[serde(default)]
    pub to_status: Option<ParcelStatus>,
    #[serde(default)]
    pub sort_bin: Option<String>,
    #[serde(default)]
    pub route_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_ref: Option<String>,
    #[serde(default)]
    pub signature_ref: Option<String>,
}

/// Result of a scan. `operation` is `None` exactly when the scan was absorbed
/// as an idempotent duplicate.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub parcel: crate::entities::Parcel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    pub duplicate: bool,
}
