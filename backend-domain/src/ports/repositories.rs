use std::collections::HashMap;

use async_trait::async_trait;

use crate::entities::{
    Manifest, ManifestItem, ManifestTotals, Operation, OperationQuery, Parcel, QrCode,
};
use crate::error::DomainError;
use crate::value_objects::{ManifestStatus, OperationType, ParcelStatus};

#[async_trait]
pub trait ParcelRepository: Send + Sync {
    /// Fails with `Validation` on a duplicate tracking number.
    async fn insert(&self, parcel: &Parcel) -> Result<(), DomainError>;
    async fn get(&self, parcel_id: &str) -> Result<Parcel, DomainError>;
    async fn get_by_tracking(&self, tracking_number: &str) -> Result<Parcel, DomainError>;

    /// Applies a state transition and appends its ledger entry as one atomic
    /// unit. The stored parcel's `(status, version)` must still match
    /// `operation.from_status` / `expected_version`, otherwise `StaleState`
    /// and nothing changes. When `detach_manifest` names a still-draft
    /// manifest the membership row is removed and the totals adjusted inside
    /// the same transaction.
    async fn apply_transition(
        &self,
        updated: &Parcel,
        expected_version: u64,
        operation: &Operation,
        detach_manifest: Option<&str>,
    ) -> Result<Operation, DomainError>;

    async fn count_by_status(
        &self,
        station_id: &str,
    ) -> Result<HashMap<ParcelStatus, u64>, DomainError>;

    async fn ping(&self) -> Result<(), DomainError>;
}

#[async_trait]
pub trait OperationRepository: Send + Sync {
    /// Ledger entries for one parcel, newest-first.
    async fn for_parcel(&self, parcel_id: &str, limit: usize)
        -> Result<Vec<Operation>, DomainError>;
    /// Filtered ledger query, newest-first.
    async fn query(&self, query: &OperationQuery) -> Result<Vec<Operation>, DomainError>;
    async fn count_by_type(
        &self,
        station_id: &str,
        from_ms: i64,
        until_ms: i64,
    ) -> Result<HashMap<OperationType, u64>, DomainError>;
}

#[async_trait]
pub trait ManifestRepository: Send + Sync {
    async fn insert(&self, manifest: &Manifest) -> Result<(), DomainError>;
    async fn get(&self, manifest_id: &str) -> Result<Manifest, DomainError>;
    async fn get_by_number(&self, manifest_number: &str) -> Result<Manifest, DomainError>;
    /// Per-day counter backing manifest number generation.
    async fn next_number_seq(&self, day_key: &str) -> Result<u64, DomainError>;

    /// Attaches a parcel: membership row + totals + parcel transition +
    /// ledger entry, all in one transaction. Fails with `NotDraft`,
    /// `AlreadyManifested` or `StaleState`; on any failure nothing changes.
    async fn add_item(
        &self,
        manifest_id: &str,
        item: &ManifestItem,
        updated_parcel: &Parcel,
        expected_parcel_version: u64,
        operation: &Operation,
    ) -> Result<Manifest, DomainError>;

    /// Reverses `add_item` while the manifest is still draft.
    async fn remove_item(
        &self,
        manifest_id: &str,
        updated_parcel: &Parcel,
        expected_parcel_version: u64,
        operation: &Operation,
    ) -> Result<Manifest, DomainError>;

    /// Advances the lifecycle one stage under a status compare-and-swap;
    /// `require_items` rejects empty manifests (finalize). Completing a
    /// manifest releases its parcels' active-manifest claim.
    async fn advance(
        &self,
        manifest_id: &str,
        from: ManifestStatus,
        to: ManifestStatus,
        now_ms: i64,
        require_items: bool,
    ) -> Result<Manifest, DomainError>;

    async fn items(&self, manifest_id: &str) -> Result<Vec<ManifestItem>, DomainError>;
    /// The active (non-completed) manifest currently claiming a parcel.
    async fn active_manifest_for(&self, parcel_id: &str) -> Result<Option<String>, DomainError>;
    async fn open_totals_for_station(
        &self,
        station_id: &str,
    ) -> Result<ManifestTotals, DomainError>;
}

#[async_trait]
pub trait QrRepository: Send + Sync {
    /// Fails with `DuplicateCode` if the code exists and is active; rebinding
    /// an inactive code is allowed.
    async fn bind(&self, qr: &QrCode) -> Result<(), DomainError>;
    async fn get(&self, code: &str) -> Result<QrCode, DomainError>;
    /// Lookup + provenance update as one unit: increments `scan_count` and
    /// stamps `last_scanned_*` atomically with the resolution.
    async fn resolve(
        &self,
        code: &str,
        operator_id: &str,
        now_ms: i64,
    ) -> Result<QrCode, DomainError>;
    /// Idempotent; no-op when already inactive.
    async fn deactivate(&self, code: &str) -> Result<(), DomainError>;
    /// Deactivates every active code bound to the target. Idempotent.
    async fn deactivate_for(&self, target_id: &str) -> Result<(), DomainError>;
}
