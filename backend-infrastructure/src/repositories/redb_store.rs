//! redb-backed warehouse store.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `parcels` | `parcel_id` | JSON `Parcel` |
//! | `parcels_by_tracking` | `tracking_number` | `parcel_id` |
//! | `qr_codes` | `code` | JSON `QrCode` |
//! | `operations` | `(parcel_id, seq)` | JSON `Operation` |
//! | `manifests` | `manifest_id` | JSON `Manifest` |
//! | `manifests_by_number` | `manifest_number` | `manifest_id` |
//! | `manifest_items` | `(manifest_id, parcel_id)` | JSON `ManifestItem` |
//! | `active_manifest` | `parcel_id` | `manifest_id` |
//! | `counters` | name | `u64` |
//!
//! One write transaction is the unit of work: a parcel transition, its ledger
//! entry and any manifest membership/total changes commit together or not at
//! all. The stored `(status, version)` pair is compared inside the
//! transaction, so a concurrent writer surfaces as `StaleState` instead of a
//! lost update. redb serializes writers; commits are durable on return.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};

use backend_domain::ports::{
    ManifestRepository, OperationRepository, ParcelRepository, QrRepository,
};
use backend_domain::utils::day_bounds;
use backend_domain::value_objects::{
    Currency, ManifestStatus, Money, OperationType, ParcelStatus, Weight,
};
use backend_domain::{
    DomainError, Manifest, ManifestItem, ManifestTotals, Operation, OperationQuery, Parcel, QrCode,
};

const PARCELS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("parcels");
const TRACKING_TABLE: TableDefinition<&str, &str> = TableDefinition::new("parcels_by_tracking");
const QR_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("qr_codes");
const OPERATIONS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("operations");
const MANIFESTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("manifests");
const MANIFEST_NUMBER_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("manifests_by_number");
const MANIFEST_ITEMS_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("manifest_items");
const ACTIVE_MANIFEST_TABLE: TableDefinition<&str, &str> = TableDefinition::new("active_manifest");
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const OP_SEQ_KEY: &str = "op_seq";

fn storage(err: impl std::error::Error + Send + Sync + 'static) -> DomainError {
    DomainError::Storage(anyhow::Error::new(err))
}

#[derive(Clone)]
pub struct RedbWarehouseStore {
    db: Arc<Database>,
}

impl RedbWarehouseStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let db = Database::create(path).map_err(storage)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// In-memory backend, used by tests up and down the workspace.
    pub fn open_in_memory() -> Result<Self, DomainError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(storage)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<(), DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let _ = txn.open_table(PARCELS_TABLE).map_err(storage)?;
            let _ = txn.open_table(TRACKING_TABLE).map_err(storage)?;
            let _ = txn.open_table(QR_TABLE).map_err(storage)?;
            let _ = txn.open_table(OPERATIONS_TABLE).map_err(storage)?;
            let _ = txn.open_table(MANIFESTS_TABLE).map_err(storage)?;
            let _ = txn.open_table(MANIFEST_NUMBER_TABLE).map_err(storage)?;
            let _ = txn.open_table(MANIFEST_ITEMS_TABLE).map_err(storage)?;
            let _ = txn.open_table(ACTIVE_MANIFEST_TABLE).map_err(storage)?;
            let mut counters = txn.open_table(COUNTERS_TABLE).map_err(storage)?;
            if counters.get(OP_SEQ_KEY).map_err(storage)?.is_none() {
                counters.insert(OP_SEQ_KEY, 0u64).map_err(storage)?;
            }
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }

    fn next_counter(&self, txn: &WriteTransaction, key: &str) -> Result<u64, DomainError> {
        let mut table = txn.open_table(COUNTERS_TABLE).map_err(storage)?;
        let current = table
            .get(key)
            .map_err(storage)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(key, next).map_err(storage)?;
        Ok(next)
    }

    fn put_parcel(&self, txn: &WriteTransaction, parcel: &Parcel) -> Result<(), DomainError> {
        let mut table = txn.open_table(PARCELS_TABLE).map_err(storage)?;
        let value = serde_json::to_vec(parcel).map_err(storage)?;
        table
            .insert(parcel.id.as_str(), value.as_slice())
            .map_err(storage)?;
        Ok(())
    }

    fn parcel_in_txn(&self, txn: &WriteTransaction, id: &str) -> Result<Parcel, DomainError> {
        // Guards borrow the write-txn table; copy out before the table drops.
        let raw = {
            let table = txn.open_table(PARCELS_TABLE).map_err(storage)?;
            let raw = table
                .get(id)
                .map_err(storage)?
                .map(|value| value.value().to_vec());
            raw
        };
        match raw {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(storage),
            None => Err(DomainError::not_found("parcel", id)),
        }
    }

    /// Compares the stored parcel against what the caller read, then writes
    /// the update. The whole check-and-swap happens inside `txn`.
    fn swap_parcel(
        &self,
        txn: &WriteTransaction,
        updated: &Parcel,
        expected_version: u64,
        expected_status: ParcelStatus,
    ) -> Result<Parcel, DomainError> {
        let stored = self.parcel_in_txn(txn, &updated.id)?;
        if stored.status != expected_status || stored.version != expected_version {
            return Err(DomainError::StaleState {
                expected: expected_status,
                actual: stored.status,
            });
        }
        self.put_parcel(txn, updated)?;
        Ok(stored)
    }

    fn append_operation(
        &self,
        txn: &WriteTransaction,
        operation: &Operation,
    ) -> Result<Operation, DomainError> {
        let seq = self.next_counter(txn, OP_SEQ_KEY)?;
        let mut recorded = operation.clone();
        recorded.seq = seq;
        let mut table = txn.open_table(OPERATIONS_TABLE).map_err(storage)?;
        let value = serde_json::to_vec(&recorded).map_err(storage)?;
        table
            .insert((recorded.parcel_id.as_str(), seq), value.as_slice())
            .map_err(storage)?;
        Ok(recorded)
    }

    fn manifest_in_txn(&self, txn: &WriteTransaction, id: &str) -> Result<Manifest, DomainError> {
        let raw = {
            let table = txn.open_table(MANIFESTS_TABLE).map_err(storage)?;
            let raw = table
                .get(id)
                .map_err(storage)?
                .map(|value| value.value().to_vec());
            raw
        };
        match raw {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(storage),
            None => Err(DomainError::not_found("manifest", id)),
        }
    }

    fn put_manifest(&self, txn: &WriteTransaction, manifest: &Manifest) -> Result<(), DomainError> {
        let mut table = txn.open_table(MANIFESTS_TABLE).map_err(storage)?;
        let value = serde_json::to_vec(manifest).map_err(storage)?;
        table
            .insert(manifest.id.as_str(), value.as_slice())
            .map_err(storage)?;
        Ok(())
    }

    fn release_claim(&self, txn: &WriteTransaction, parcel_id: &str) -> Result<(), DomainError> {
        let mut table = txn.open_table(ACTIVE_MANIFEST_TABLE).map_err(storage)?;
        table.remove(parcel_id).map_err(storage)?;
        Ok(())
    }

    /// Drops the membership row and rolls the totals back. Draft only; used
    /// by remove_parcel and the exception auto-detach.
    fn detach_item(
        &self,
        txn: &WriteTransaction,
        manifest_id: &str,
        parcel: &Parcel,
    ) -> Result<Manifest, DomainError> {
        let mut manifest = self.manifest_in_txn(txn, manifest_id)?;
        if manifest.status != ManifestStatus::Draft {
            return Err(DomainError::NotDraft {
                manifest: manifest.manifest_number,
                status: manifest.status,
            });
        }
        {
            let mut items = txn.open_table(MANIFEST_ITEMS_TABLE).map_err(storage)?;
            let removed = items
                .remove((manifest_id, parcel.id.as_str()))
                .map_err(storage)?;
            if removed.is_none() {
                return Err(DomainError::Validation(format!(
                    "parcel '{}' is not on manifest '{}'",
                    parcel.tracking_number, manifest.manifest_number
                )));
            }
        }
        manifest.total_parcels = manifest.total_parcels.saturating_sub(1);
        manifest.total_weight = manifest.total_weight - parcel.weight;
        manifest.total_cod = manifest.total_cod.try_sub(&parcel.cod_amount)?;
        self.put_manifest(txn, &manifest)?;
        self.release_claim(txn, &parcel.id)?;
        Ok(manifest)
    }
}

#[async_trait]
impl ParcelRepository for RedbWarehouseStore {
    async fn insert(&self, parcel: &Parcel) -> Result<(), DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut tracking = txn.open_table(TRACKING_TABLE).map_err(storage)?;
            if tracking
                .get(parcel.tracking_number.as_str())
                .map_err(storage)?
                .is_some()
            {
                return Err(DomainError::Validation(format!(
                    "duplicate tracking number '{}'",
                    parcel.tracking_number
                )));
            }
            tracking
                .insert(parcel.tracking_number.as_str(), parcel.id.as_str())
                .map_err(storage)?;
            self.put_parcel(&txn, parcel)?;
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }

    async fn get(&self, parcel_id: &str) -> Result<Parcel, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(PARCELS_TABLE).map_err(storage)?;
        match table.get(parcel_id).map_err(storage)? {
            Some(value) => serde_json::from_slice(value.value()).map_err(storage),
            None => Err(DomainError::not_found("parcel", parcel_id)),
        }
    }

    async fn get_by_tracking(&self, tracking_number: &str) -> Result<Parcel, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let tracking = txn.open_table(TRACKING_TABLE).map_err(storage)?;
        let id = match tracking.get(tracking_number).map_err(storage)? {
            Some(value) => value.value().to_string(),
            None => return Err(DomainError::not_found("parcel", tracking_number)),
        };
        let table = txn.open_table(PARCELS_TABLE).map_err(storage)?;
        match table.get(id.as_str()).map_err(storage)? {
            Some(value) => serde_json::from_slice(value.value()).map_err(storage),
            None => Err(DomainError::not_found("parcel", tracking_number)),
        }
    }

    async fn apply_transition(
        &self,
        updated: &Parcel,
        expected_version: u64,
        operation: &Operation,
        detach_manifest: Option<&str>,
    ) -> Result<Operation, DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        let recorded = {
            let stored = self.swap_parcel(&txn, updated, expected_version, operation.from_status)?;
            if let Some(manifest_id) = detach_manifest {
                self.detach_item(&txn, manifest_id, &stored)?;
            } else if stored.manifest_id.is_some() && updated.manifest_id.is_none() {
                // Arrival scans release the claim but keep the membership
                // row for the audit trail.
                self.release_claim(&txn, &stored.id)?;
            }
            self.append_operation(&txn, operation)?
        };
        txn.commit().map_err(storage)?;
        Ok(recorded)
    }

    async fn count_by_status(
        &self,
        station_id: &str,
    ) -> Result<HashMap<ParcelStatus, u64>, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(PARCELS_TABLE).map_err(storage)?;
        let mut counts = HashMap::new();
        for entry in table.iter().map_err(storage)? {
            let (_, value) = entry.map_err(storage)?;
            let parcel: Parcel = serde_json::from_slice(value.value()).map_err(storage)?;
            if parcel.station_id == station_id {
                *counts.entry(parcel.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        txn.open_table(PARCELS_TABLE).map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl OperationRepository for RedbWarehouseStore {
    async fn for_parcel(
        &self,
        parcel_id: &str,
        limit: usize,
    ) -> Result<Vec<Operation>, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(OPERATIONS_TABLE).map_err(storage)?;
        let mut operations = Vec::new();
        let range = (parcel_id, 0u64)..=(parcel_id, u64::MAX);
        for entry in table.range(range).map_err(storage)? {
            let (_, value) = entry.map_err(storage)?;
            let operation: Operation = serde_json::from_slice(value.value()).map_err(storage)?;
            operations.push(operation);
        }
        operations.sort_by(|a, b| b.seq.cmp(&a.seq));
        operations.truncate(limit);
        Ok(operations)
    }

    async fn query(&self, query: &OperationQuery) -> Result<Vec<Operation>, DomainError> {
        let bounds = match &query.date {
            Some(date) => Some(day_bounds(date).map_err(|err| {
                DomainError::Validation(format!("invalid date '{}': {}", date, err))
            })?),
            None => None,
        };
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(OPERATIONS_TABLE).map_err(storage)?;
        let mut operations = Vec::new();
        for entry in table.iter().map_err(storage)? {
            let (_, value) = entry.map_err(storage)?;
            let operation: Operation = serde_json::from_slice(value.value()).map_err(storage)?;
            if let Some(station_id) = &query.station_id {
                if operation.station_id != *station_id {
                    continue;
                }
            }
            if let Some((from_ms, until_ms)) = bounds {
                if operation.created_at < from_ms || operation.created_at >= until_ms {
                    continue;
                }
            }
            operations.push(operation);
        }
        operations.sort_by(|a, b| b.seq.cmp(&a.seq));
        if let Some(limit) = query.limit {
            operations.truncate(limit);
        }
        Ok(operations)
    }

    async fn count_by_type(
        &self,
        station_id: &str,
        from_ms: i64,
        until_ms: i64,
    ) -> Result<HashMap<OperationType, u64>, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(OPERATIONS_TABLE).map_err(storage)?;
        let mut counts = HashMap::new();
        for entry in table.iter().map_err(storage)? {
            let (_, value) = entry.map_err(storage)?;
            let operation: Operation = serde_json::from_slice(value.value()).map_err(storage)?;
            if operation.station_id == station_id
                && operation.created_at >= from_ms
                && operation.created_at < until_ms
            {
                *counts.entry(operation.operation_type).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl ManifestRepository for RedbWarehouseStore {
    async fn insert(&self, manifest: &Manifest) -> Result<(), DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut numbers = txn.open_table(MANIFEST_NUMBER_TABLE).map_err(storage)?;
            if numbers
                .get(manifest.manifest_number.as_str())
                .map_err(storage)?
                .is_some()
            {
                return Err(DomainError::Validation(format!(
                    "duplicate manifest number '{}'",
                    manifest.manifest_number
                )));
            }
            numbers
                .insert(manifest.manifest_number.as_str(), manifest.id.as_str())
                .map_err(storage)?;
            self.put_manifest(&txn, manifest)?;
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }

    async fn get(&self, manifest_id: &str) -> Result<Manifest, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(MANIFESTS_TABLE).map_err(storage)?;
        match table.get(manifest_id).map_err(storage)? {
            Some(value) => serde_json::from_slice(value.value()).map_err(storage),
            None => Err(DomainError::not_found("manifest", manifest_id)),
        }
    }

    async fn get_by_number(&self, manifest_number: &str) -> Result<Manifest, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let numbers = txn.open_table(MANIFEST_NUMBER_TABLE).map_err(storage)?;
        let id = match numbers.get(manifest_number).map_err(storage)? {
            Some(value) => value.value().to_string(),
            None => return Err(DomainError::not_found("manifest", manifest_number)),
        };
        let table = txn.open_table(MANIFESTS_TABLE).map_err(storage)?;
        match table.get(id.as_str()).map_err(storage)? {
            Some(value) => serde_json::from_slice(value.value()).map_err(storage),
            None => Err(DomainError::not_found("manifest", manifest_number)),
        }
    }

    async fn next_number_seq(&self, day_key: &str) -> Result<u64, DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        let seq = self.next_counter(&txn, &format!("mf:{}", day_key))?;
        txn.commit().map_err(storage)?;
        Ok(seq)
    }

    async fn add_item(
        &self,
        manifest_id: &str,
        item: &ManifestItem,
        updated_parcel: &Parcel,
        expected_parcel_version: u64,
        operation: &Operation,
    ) -> Result<Manifest, DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        let manifest = {
            let mut manifest = self.manifest_in_txn(&txn, manifest_id)?;
            if manifest.status != ManifestStatus::Draft {
                return Err(DomainError::NotDraft {
                    manifest: manifest.manifest_number,
                    status: manifest.status,
                });
            }
            let holder = {
                let claims = txn.open_table(ACTIVE_MANIFEST_TABLE).map_err(storage)?;
                let holder = claims
                    .get(item.parcel_id.as_str())
                    .map_err(storage)?
                    .map(|value| value.value().to_string());
                holder
            };
            if let Some(holder_id) = holder {
                // Operators see manifest numbers, not internal ids.
                let holder = self.manifest_in_txn(&txn, &holder_id)?;
                return Err(DomainError::AlreadyManifested {
                    parcel: item.tracking_number.clone(),
                    manifest: holder.manifest_number,
                });
            }
            let stored = self.swap_parcel(
                &txn,
                updated_parcel,
                expected_parcel_version,
                operation.from_status,
            )?;
            {
                let mut items = txn.open_table(MANIFEST_ITEMS_TABLE).map_err(storage)?;
                let value = serde_json::to_vec(item).map_err(storage)?;
                items
                    .insert((manifest_id, item.parcel_id.as_str()), value.as_slice())
                    .map_err(storage)?;
            }
            {
                let mut claims = txn.open_table(ACTIVE_MANIFEST_TABLE).map_err(storage)?;
                claims
                    .insert(item.parcel_id.as_str(), manifest_id)
                    .map_err(storage)?;
            }
            manifest.total_parcels += 1;
            manifest.total_weight = manifest.total_weight + stored.weight;
            manifest.total_cod = manifest.total_cod.try_add(&stored.cod_amount)?;
            self.put_manifest(&txn, &manifest)?;
            self.append_operation(&txn, operation)?;
            manifest
        };
        txn.commit().map_err(storage)?;
        Ok(manifest)
    }

    async fn remove_item(
        &self,
        manifest_id: &str,
        updated_parcel: &Parcel,
        expected_parcel_version: u64,
        operation: &Operation,
    ) -> Result<Manifest, DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        let manifest = {
            let stored = self.swap_parcel(
                &txn,
                updated_parcel,
                expected_parcel_version,
                operation.from_status,
            )?;
            let manifest = self.detach_item(&txn, manifest_id, &stored)?;
            self.append_operation(&txn, operation)?;
            manifest
        };
        txn.commit().map_err(storage)?;
        Ok(manifest)
    }

    async fn advance(
        &self,
        manifest_id: &str,
        from: ManifestStatus,
        to: ManifestStatus,
        now_ms: i64,
        require_items: bool,
    ) -> Result<Manifest, DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        let manifest = {
            let mut manifest = self.manifest_in_txn(&txn, manifest_id)?;
            if manifest.status != from {
                return Err(DomainError::WrongManifestStatus {
                    manifest: manifest.manifest_number,
                    status: manifest.status,
                    expected: from,
                });
            }
            if require_items && manifest.total_parcels == 0 {
                return Err(DomainError::EmptyManifest(manifest.manifest_number));
            }
            manifest.stamp_stage(to, now_ms);
            self.put_manifest(&txn, &manifest)?;
            if to == ManifestStatus::Completed {
                let parcel_ids: Vec<String> = {
                    let items = txn.open_table(MANIFEST_ITEMS_TABLE).map_err(storage)?;
                    let mut ids = Vec::new();
                    for entry in items.iter().map_err(storage)? {
                        let (key, _) = entry.map_err(storage)?;
                        if key.value().0 == manifest_id {
                            ids.push(key.value().1.to_string());
                        }
                    }
                    ids
                };
                let mut claims = txn.open_table(ACTIVE_MANIFEST_TABLE).map_err(storage)?;
                for parcel_id in parcel_ids {
                    let held_here = claims
                        .get(parcel_id.as_str())
                        .map_err(storage)?
                        .map(|value| value.value() == manifest_id)
                        .unwrap_or(false);
                    if held_here {
                        claims.remove(parcel_id.as_str()).map_err(storage)?;
                    }
                }
            }
            manifest
        };
        txn.commit().map_err(storage)?;
        Ok(manifest)
    }

    async fn items(&self, manifest_id: &str) -> Result<Vec<ManifestItem>, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(MANIFEST_ITEMS_TABLE).map_err(storage)?;
        let mut items = Vec::new();
        for entry in table.iter().map_err(storage)? {
            let (key, value) = entry.map_err(storage)?;
            if key.value().0 == manifest_id {
                let item: ManifestItem = serde_json::from_slice(value.value()).map_err(storage)?;
                items.push(item);
            }
        }
        items.sort_by_key(|item| item.scanned_at);
        Ok(items)
    }

    async fn active_manifest_for(&self, parcel_id: &str) -> Result<Option<String>, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let claims = txn.open_table(ACTIVE_MANIFEST_TABLE).map_err(storage)?;
        Ok(claims
            .get(parcel_id)
            .map_err(storage)?
            .map(|value| value.value().to_string()))
    }

    async fn open_totals_for_station(
        &self,
        station_id: &str,
    ) -> Result<ManifestTotals, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(MANIFESTS_TABLE).map_err(storage)?;
        let mut totals: Option<ManifestTotals> = None;
        let mut manifests = 0u64;
        let mut parcels = 0u64;
        for entry in table.iter().map_err(storage)? {
            let (_, value) = entry.map_err(storage)?;
            let manifest: Manifest = serde_json::from_slice(value.value()).map_err(storage)?;
            if manifest.origin_station_id != station_id || !manifest.status.is_active() {
                continue;
            }
            manifests += 1;
            parcels += manifest.total_parcels;
            totals = Some(match totals {
                Some(acc) => ManifestTotals {
                    manifests,
                    parcels,
                    weight: acc.weight + manifest.total_weight,
                    cod: acc.cod.try_add(&manifest.total_cod)?,
                },
                None => ManifestTotals {
                    manifests,
                    parcels,
                    weight: manifest.total_weight,
                    cod: manifest.total_cod,
                },
            });
        }
        Ok(totals.unwrap_or(ManifestTotals {
            manifests: 0,
            parcels: 0,
            weight: Weight::ZERO,
            cod: Money::zero(Currency::default()),
        }))
    }
}

#[async_trait]
impl QrRepository for RedbWarehouseStore {
    async fn bind(&self, qr: &QrCode) -> Result<(), DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(QR_TABLE).map_err(storage)?;
            if let Some(existing) = table.get(qr.code.as_str()).map_err(storage)? {
                let existing: QrCode =
                    serde_json::from_slice(existing.value()).map_err(storage)?;
                if existing.active {
                    return Err(DomainError::DuplicateCode(qr.code.clone()));
                }
            }
            let value = serde_json::to_vec(qr).map_err(storage)?;
            table
                .insert(qr.code.as_str(), value.as_slice())
                .map_err(storage)?;
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<QrCode, DomainError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(QR_TABLE).map_err(storage)?;
        match table.get(code).map_err(storage)? {
            Some(value) => serde_json::from_slice(value.value()).map_err(storage),
            None => Err(DomainError::not_found("qr code", code)),
        }
    }

    async fn resolve(
        &self,
        code: &str,
        operator_id: &str,
        now_ms: i64,
    ) -> Result<QrCode, DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        let qr = {
            let mut table = txn.open_table(QR_TABLE).map_err(storage)?;
            let mut qr: QrCode = match table.get(code).map_err(storage)? {
                Some(value) => serde_json::from_slice(value.value()).map_err(storage)?,
                None => return Err(DomainError::not_found("qr code", code)),
            };
            if !qr.active {
                return Err(DomainError::InactiveCode(code.to_string()));
            }
            if qr.is_expired(now_ms) {
                return Err(DomainError::ExpiredCode(code.to_string()));
            }
            qr.scan_count += 1;
            qr.last_scanned_at = Some(now_ms);
            qr.last_scanned_by = Some(operator_id.to_string());
            let value = serde_json::to_vec(&qr).map_err(storage)?;
            table.insert(code, value.as_slice()).map_err(storage)?;
            qr
        };
        txn.commit().map_err(storage)?;
        Ok(qr)
    }

    async fn deactivate(&self, code: &str) -> Result<(), DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(QR_TABLE).map_err(storage)?;
            let mut qr: QrCode = match table.get(code).map_err(storage)? {
                Some(value) => serde_json::from_slice(value.value()).map_err(storage)?,
                None => return Err(DomainError::not_found("qr code", code)),
            };
            if qr.active {
                qr.active = false;
                let value = serde_json::to_vec(&qr).map_err(storage)?;
                table.insert(code, value.as_slice()).map_err(storage)?;
            }
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }

    async fn deactivate_for(&self, target_id: &str) -> Result<(), DomainError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(QR_TABLE).map_err(storage)?;
            let mut stale = Vec::new();
            for entry in table.iter().map_err(storage)? {
                let (_, value) = entry.map_err(storage)?;
                let qr: QrCode = serde_json::from_slice(value.value()).map_err(storage)?;
                if qr.active && qr.target_id == target_id {
                    stale.push(qr);
                }
            }
            for mut qr in stale {
                qr.active = false;
                let value = serde_json::to_vec(&qr).map_err(storage)?;
                table
                    .insert(qr.code.as_str(), value.as_slice())
                    .map_err(storage)?;
            }
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::value_objects::{
        Currency, ManifestType, Money, QrTargetKind, ScanMethod, Weight,
    };
    use backend_domain::ContactInfo;
    use rust_decimal::Decimal;

    fn contact(name: &str) -> ContactInfo {
        ContactInfo {
            name: name.to_string(),
            phone: "0912345678".to_string(),
            address: "12 Depot Rd".to_string(),
        }
    }

    fn parcel(id: &str, tracking: &str, kg: i64) -> Parcel {
        Parcel {
            id: id.to_string(),
            tracking_number: tracking.to_string(),
            sender: contact("sender"),
            receiver: contact("receiver"),
            weight: Weight::from_kg(Decimal::from(kg)).expect("weight"),
            declared_value: Money::zero(Currency::Mmk),
            cod_amount: Money::new(Decimal::from(1000), Currency::Mmk).expect("cod"),
            fragile: false,
            signature_required: false,
            status: ParcelStatus::Created,
            station_id: "ST-01".to_string(),
            sort_bin: None,
            route_code: None,
            manifest_id: None,
            version: 0,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    fn operation(parcel: &Parcel, op: OperationType, to: ParcelStatus) -> Operation {
        Operation {
            id: format!("op-{}", parcel.tracking_number),
            seq: 0,
            operation_type: op,
            parcel_id: parcel.id.clone(),
            tracking_number: parcel.tracking_number.clone(),
            station_id: parcel.station_id.clone(),
            operator_id: "worker-1".to_string(),
            scan_method: ScanMethod::QrScanner,
            from_status: parcel.status,
            to_status: to,
            sort_bin: None,
            route_code: None,
            notes: None,
            photo_ref: None,
            signature_ref: None,
            created_at: 2_000,
        }
    }

    fn manifest(id: &str, number: &str) -> Manifest {
        Manifest {
            id: id.to_string(),
            manifest_number: number.to_string(),
            manifest_type: ManifestType::Delivery,
            origin_station_id: "ST-01".to_string(),
            destination_station_id: None,
            vehicle_plate: None,
            driver_name: None,
            driver_phone: None,
            status: ManifestStatus::Draft,
            total_parcels: 0,
            total_weight: Weight::ZERO,
            total_cod: Money::zero(Currency::Mmk),
            created_by: "dispatcher".to_string(),
            created_at: 1_000,
            finalized_at: None,
            dispatched_at: None,
            arrived_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_tracking() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let first = parcel("p1", "BRT-1", 1);
        let second = parcel("p2", "BRT-1", 2);
        ParcelRepository::insert(&store, &first).await.expect("first insert");
        let err = ParcelRepository::insert(&store, &second)
            .await
            .expect_err("duplicate");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn transition_and_ledger_commit_together() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let stored = parcel("p1", "BRT-1", 1);
        ParcelRepository::insert(&store, &stored).await.expect("insert");

        let mut updated = stored.clone();
        updated.status = ParcelStatus::InboundReceived;
        updated.version = 1;
        let op = operation(&stored, OperationType::ScanIn, ParcelStatus::InboundReceived);
        let recorded = store
            .apply_transition(&updated, 0, &op, None)
            .await
            .expect("transition");
        assert_eq!(recorded.seq, 1);

        let reread = ParcelRepository::get(&store, "p1").await.expect("get");
        assert_eq!(reread.status, ParcelStatus::InboundReceived);
        assert_eq!(reread.version, 1);
        let history = store.for_parcel("p1", 10).await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].to_status, ParcelStatus::InboundReceived);
    }

    #[tokio::test]
    async fn stale_write_changes_nothing() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let stored = parcel("p1", "BRT-1", 1);
        ParcelRepository::insert(&store, &stored).await.expect("insert");

        let mut updated = stored.clone();
        updated.status = ParcelStatus::InboundReceived;
        updated.version = 1;
        let op = operation(&stored, OperationType::ScanIn, ParcelStatus::InboundReceived);
        store
            .apply_transition(&updated, 0, &op, None)
            .await
            .expect("first transition");

        // Second writer still holds the version-0 read.
        let err = store
            .apply_transition(&updated, 0, &op, None)
            .await
            .expect_err("stale");
        assert!(matches!(err, DomainError::StaleState { .. }));
        let history = store.for_parcel("p1", 10).await.expect("history");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn add_item_maintains_totals_and_exclusivity() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let mut stored = parcel("p1", "BRT-1", 3);
        stored.status = ParcelStatus::Sorted;
        ParcelRepository::insert(&store, &stored).await.expect("insert");
        let first = manifest("m1", "MF-20260826-0001");
        let second = manifest("m2", "MF-20260826-0002");
        ManifestRepository::insert(&store, &first).await.expect("m1");
        ManifestRepository::insert(&store, &second).await.expect("m2");

        let mut updated = stored.clone();
        updated.status = ParcelStatus::Manifested;
        updated.manifest_id = Some("m1".to_string());
        updated.version = 1;
        let item = ManifestItem {
            manifest_id: "m1".to_string(),
            parcel_id: "p1".to_string(),
            tracking_number: "BRT-1".to_string(),
            scanned_at: 2_000,
            scanned_by: "worker-1".to_string(),
        };
        let op = operation(&stored, OperationType::Load, ParcelStatus::Manifested);
        let result = store
            .add_item("m1", &item, &updated, 0, &op)
            .await
            .expect("add item");
        assert_eq!(result.total_parcels, 1);
        assert_eq!(result.total_weight.kg(), Decimal::from(3));
        assert_eq!(result.total_cod.amount, Decimal::from(1000));

        let claim = store.active_manifest_for("p1").await.expect("claim");
        assert_eq!(claim.as_deref(), Some("m1"));

        let err = store
            .add_item("m2", &item, &updated, 1, &op)
            .await
            .expect_err("exclusive");
        match err {
            DomainError::AlreadyManifested { manifest, .. } => {
                assert_eq!(manifest, "MF-20260826-0001")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn finalize_rejects_empty_manifest() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let draft = manifest("m1", "MF-20260826-0001");
        ManifestRepository::insert(&store, &draft).await.expect("insert");
        let err = store
            .advance("m1", ManifestStatus::Draft, ManifestStatus::Finalized, 2_000, true)
            .await
            .expect_err("empty finalize");
        assert!(matches!(err, DomainError::EmptyManifest(_)));
    }

    #[tokio::test]
    async fn advance_requires_the_strict_predecessor() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let draft = manifest("m1", "MF-20260826-0001");
        ManifestRepository::insert(&store, &draft).await.expect("insert");
        let err = store
            .advance("m1", ManifestStatus::Finalized, ManifestStatus::Dispatched, 2_000, false)
            .await
            .expect_err("wrong stage");
        assert!(matches!(err, DomainError::WrongManifestStatus { .. }));
    }

    #[tokio::test]
    async fn qr_resolve_counts_scans_and_rejects_inactive() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let qr = QrCode::new("PCL-1", QrTargetKind::Parcel, "p1", None, 1_000);
        store.bind(&qr).await.expect("bind");

        let resolved = store.resolve("PCL-1", "worker-1", 2_000).await.expect("resolve");
        assert_eq!(resolved.scan_count, 1);
        assert_eq!(resolved.last_scanned_by.as_deref(), Some("worker-1"));
        let resolved = store.resolve("PCL-1", "worker-2", 3_000).await.expect("resolve");
        assert_eq!(resolved.scan_count, 2);

        store.deactivate("PCL-1").await.expect("deactivate");
        store.deactivate("PCL-1").await.expect("idempotent");
        let err = store
            .resolve("PCL-1", "worker-1", 4_000)
            .await
            .expect_err("inactive");
        assert!(matches!(err, DomainError::InactiveCode(_)));
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_rebinding_inactive_is_allowed() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let qr = QrCode::new("PCL-1", QrTargetKind::Parcel, "p1", Some(5_000), 1_000);
        store.bind(&qr).await.expect("bind");
        let err = store
            .resolve("PCL-1", "worker-1", 6_000)
            .await
            .expect_err("expired");
        assert!(matches!(err, DomainError::ExpiredCode(_)));

        let active_dup = QrCode::new("PCL-1", QrTargetKind::Parcel, "p2", None, 7_000);
        let err = store.bind(&active_dup).await.expect_err("active duplicate");
        assert!(matches!(err, DomainError::DuplicateCode(_)));

        store.deactivate("PCL-1").await.expect("deactivate");
        store.bind(&active_dup).await.expect("rebind inactive");
    }

    #[tokio::test]
    async fn deactivate_for_retires_every_code_of_a_target() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        let first = QrCode::new("PCL-1", QrTargetKind::Parcel, "p1", None, 1_000);
        let other = QrCode::new("PCL-2", QrTargetKind::Parcel, "p2", None, 1_000);
        store.bind(&first).await.expect("bind first");
        store.bind(&other).await.expect("bind other");

        store.deactivate_for("p1").await.expect("deactivate");
        store.deactivate_for("p1").await.expect("idempotent");

        assert!(!QrRepository::get(&store, "PCL-1").await.expect("get").active);
        assert!(QrRepository::get(&store, "PCL-2").await.expect("get").active);
    }

    #[tokio::test]
    async fn manifest_numbers_count_per_day() {
        let store = RedbWarehouseStore::open_in_memory().expect("store");
        assert_eq!(store.next_number_seq("20260826").await.expect("seq"), 1);
        assert_eq!(store.next_number_seq("20260826").await.expect("seq"), 2);
        assert_eq!(store.next_number_seq("20260827").await.expect("seq"), 1);
    }
}
