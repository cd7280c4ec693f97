//! End-to-end lifecycle flows wired against the in-memory store, exercising
//! the command layer the same way the HTTP handlers do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use backend_application::commands::{manifest_commands, parcel_commands, scan_commands};
use backend_application::queries::{parcel_queries, stats_queries};
use backend_application::{AppError, AppState, Metrics};
use backend_domain::ports::{ParcelRepository, QrRepository};
use backend_domain::services::ScanGuard;
use backend_domain::value_objects::{
    Currency, ManifestType, OperationType, ParcelStatus, ScanMethod,
};
use backend_domain::{
    ContactInfo, DomainError, IntakeEnvelope, ManifestAddParcel, ManifestCreate, Operation,
    Parcel, ParcelIntake, ParcelRegistration, RuntimeConfig, ScanRequest, Station,
};
use backend_infrastructure::{FileStationDirectory, RedbWarehouseStore, WebhookDeliveryNotifier};

fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        api_token: None,
        data_path: ":memory:".to_string(),
        stations_path: ":memory:".to_string(),
        default_currency: Currency::Mmk,
        scan_dedup_window_seconds: 10,
        stale_retry_attempts: 2,
        stale_retry_delay_ms: 1,
        pod_webhook_url: None,
        pod_webhook_template: None,
        max_body_bytes: 8 * 1024 * 1024,
        request_timeout_seconds: 5,
    }
}

fn test_state() -> AppState {
    let store = Arc::new(RedbWarehouseStore::open_in_memory().expect("in-memory store"));
    state_with_store(store)
}

fn state_with_store(store: Arc<RedbWarehouseStore>) -> AppState {
    let stations = FileStationDirectory::from_stations(vec![
        Station {
            id: "ST-01".to_string(),
            name: "Central Depot".to_string(),
            zone: Some("north".to_string()),
            capacity: Some(5_000),
        },
        Station {
            id: "ST-02".to_string(),
            name: "East Hub".to_string(),
            zone: None,
            capacity: None,
        },
    ]);
    AppState {
        config: test_config(),
        parcels: store.clone(),
        operations: store.clone(),
        manifests: store.clone(),
        qr_codes: store,
        stations: Arc::new(stations),
        notifier: Arc::new(WebhookDeliveryNotifier::new()),
        scan_guard: Arc::new(Mutex::new(ScanGuard::default())),
        metrics: Arc::new(Metrics::default()),
    }
}

fn contact(name: &str) -> ContactInfo {
    ContactInfo {
        name: name.to_string(),
        phone: "09-555-0000".to_string(),
        address: "12 Depot Rd".to_string(),
    }
}

fn intake(tracking: &str, station: &str) -> ParcelIntake {
    ParcelIntake {
        tracking_number: tracking.to_string(),
        sender: contact("Aye"),
        receiver: contact("Min"),
        weight_kg: Decimal::new(15, 1),
        declared_value: Some(Decimal::new(12_000, 0)),
        cod_amount: None,
        currency: None,
        fragile: false,
        signature_required: false,
        station_id: station.to_string(),
        route_code: None,
    }
}

async fn register_one(state: &AppState, tracking: &str) -> ParcelRegistration {
    let registrations = parcel_commands::register_parcels(
        state,
        IntakeEnvelope {
            parcels: vec![intake(tracking, "ST-01")],
        },
    )
    .await
    .expect("registration");
    registrations.into_iter().next().expect("one registration")
}

fn scan(code: &str, operation: OperationType, to_status: Option<ParcelStatus>) -> ScanRequest {
    ScanRequest {
        code: code.to_string(),
        operation_type: operation,
        station_id: "ST-01".to_string(),
        operator_id: "op-7".to_string(),
        scan_method: ScanMethod::QrScanner,
        to_status,
        sort_bin: None,
        route_code: None,
        notes: None,
        photo_ref: None,
        signature_ref: None,
    }
}

fn manifest_create() -> ManifestCreate {
    ManifestCreate {
        manifest_type: ManifestType::Delivery,
        origin_station_id: "ST-01".to_string(),
        destination_station_id: Some("ST-02".to_string()),
        vehicle_plate: Some("YGN-4421".to_string()),
        driver_name: None,
        driver_phone: None,
        created_by: "dispatcher-1".to_string(),
    }
}

/// Drives a freshly registered parcel to `sorted` via its QR code.
async fn sorted_parcel(state: &AppState, tracking: &str) -> String {
    let registration = register_one(state, tracking).await;
    let code = registration.qr.code.clone();
    scan_commands::process_scan(state, scan(&code, OperationType::ScanIn, None))
        .await
        .expect("scan in");
    scan_commands::process_scan(state, scan(&code, OperationType::Sort, None))
        .await
        .expect("sort");
    code
}

#[tokio::test]
async fn intake_then_first_scan_lands_in_inbound() {
    let state = test_state();
    let registration = register_one(&state, "BRT-100").await;
    assert_eq!(registration.parcel.status, ParcelStatus::Created);
    assert_eq!(registration.parcel.version, 0);
    assert!(registration.qr.code.starts_with("PCL-"));

    let outcome =
        scan_commands::process_scan(&state, scan(&registration.qr.code, OperationType::ScanIn, None))
            .await
            .expect("scan in");
    assert_eq!(outcome.parcel.status, ParcelStatus::InboundReceived);
    assert!(!outcome.duplicate);
    let operation = outcome.operation.expect("ledger entry");
    assert_eq!(operation.from_status, ParcelStatus::Created);
    assert_eq!(operation.to_status, ParcelStatus::InboundReceived);

    let history = parcel_queries::parcel_history(&state, "BRT-100", None)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn repeat_scan_is_absorbed_without_a_second_ledger_entry() {
    let state = test_state();
    let registration = register_one(&state, "BRT-101").await;
    let code = registration.qr.code;

    scan_commands::process_scan(&state, scan(&code, OperationType::ScanIn, None))
        .await
        .expect("first scan");
    let repeat = scan_commands::process_scan(&state, scan(&code, OperationType::ScanIn, None))
        .await
        .expect("repeat scan");
    assert!(repeat.duplicate);
    assert!(repeat.operation.is_none());
    assert_eq!(repeat.parcel.status, ParcelStatus::InboundReceived);

    let history = parcel_queries::parcel_history(&state, "BRT-101", None)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn sorted_parcel_joins_exactly_one_manifest() {
    let state = test_state();
    sorted_parcel(&state, "BRT-102").await;

    let created = manifest_commands::create_manifest(&state, manifest_create())
        .await
        .expect("manifest");
    assert_eq!(created.qr.code, created.manifest.manifest_number);

    let manifest = manifest_commands::add_parcel(
        &state,
        &created.manifest.manifest_number,
        ManifestAddParcel {
            parcel: "BRT-102".to_string(),
            scanned_by: "loader-3".to_string(),
        },
    )
    .await
    .expect("add parcel");
    assert_eq!(manifest.total_parcels, 1);

    let parcel = parcel_queries::get_parcel(&state, "BRT-102")
        .await
        .expect("parcel");
    assert_eq!(parcel.status, ParcelStatus::Manifested);
    assert_eq!(parcel.manifest_id.as_deref(), Some(manifest.id.as_str()));

    let second = manifest_commands::create_manifest(&state, manifest_create())
        .await
        .expect("second manifest");
    let err = manifest_commands::add_parcel(
        &state,
        &second.manifest.manifest_number,
        ManifestAddParcel {
            parcel: "BRT-102".to_string(),
            scanned_by: "loader-3".to_string(),
        },
    )
    .await
    .expect_err("exclusivity");
    match err {
        AppError::Domain(DomainError::AlreadyManifested { manifest, .. }) => {
            assert_eq!(manifest, created.manifest.manifest_number)
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn rejected_scan_does_not_mask_a_later_valid_one() {
    let state = test_state();
    let registration = register_one(&state, "BRT-109").await;
    let code = registration.qr.code.clone();

    // An out-of-order sort is rejected and must not enter the dedup window.
    let err = scan_commands::process_scan(&state, scan(&code, OperationType::Sort, None))
        .await
        .expect_err("sort before intake");
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidTransition { .. })
    ));

    scan_commands::process_scan(&state, scan(&code, OperationType::ScanIn, None))
        .await
        .expect("scan in");
    let outcome = scan_commands::process_scan(&state, scan(&code, OperationType::Sort, None))
        .await
        .expect("sort");
    assert!(!outcome.duplicate);
    assert_eq!(outcome.parcel.status, ParcelStatus::Sorted);
    assert!(outcome.operation.is_some());
}

#[tokio::test]
async fn empty_manifest_cannot_be_finalized() {
    let state = test_state();
    let created = manifest_commands::create_manifest(&state, manifest_create())
        .await
        .expect("manifest");
    let err = manifest_commands::finalize_manifest(&state, &created.manifest.manifest_number)
        .await
        .expect_err("empty finalize");
    assert!(matches!(
        err,
        AppError::Domain(DomainError::EmptyManifest(_))
    ));
}

#[tokio::test]
async fn finalized_manifest_rejects_membership_changes() {
    let state = test_state();
    sorted_parcel(&state, "BRT-103").await;
    sorted_parcel(&state, "BRT-104").await;

    let created = manifest_commands::create_manifest(&state, manifest_create())
        .await
        .expect("manifest");
    let number = created.manifest.manifest_number.clone();
    manifest_commands::add_parcel(
        &state,
        &number,
        ManifestAddParcel {
            parcel: "BRT-103".to_string(),
            scanned_by: "loader-3".to_string(),
        },
    )
    .await
    .expect("add parcel");
    manifest_commands::finalize_manifest(&state, &number)
        .await
        .expect("finalize");

    let err = manifest_commands::add_parcel(
        &state,
        &number,
        ManifestAddParcel {
            parcel: "BRT-104".to_string(),
            scanned_by: "loader-3".to_string(),
        },
    )
    .await
    .expect_err("add after finalize");
    assert!(matches!(err, AppError::Domain(DomainError::NotDraft { .. })));
}

#[tokio::test]
async fn delivery_retires_the_parcel_label() {
    let state = test_state();
    let code = sorted_parcel(&state, "BRT-105").await;

    let out = scan_commands::process_scan(&state, scan(&code, OperationType::ScanOut, None))
        .await
        .expect("scan out");
    assert_eq!(out.parcel.status, ParcelStatus::OutForDelivery);

    let delivered = scan_commands::process_scan(&state, scan(&code, OperationType::ScanOut, None))
        .await
        .expect("delivery");
    assert_eq!(delivered.parcel.status, ParcelStatus::Delivered);

    // The label is deactivated once the parcel is terminal.
    let err = scan_commands::process_scan(&state, scan(&code, OperationType::ScanOut, None))
        .await
        .expect_err("retired label");
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InactiveCode(_))
    ));
}

#[tokio::test]
async fn cancellation_by_tracking_number_retires_the_label() {
    let state = test_state();
    let registration = register_one(&state, "BRT-110").await;

    let outcome = scan_commands::process_scan(
        &state,
        scan(
            "BRT-110",
            OperationType::ScanIn,
            Some(ParcelStatus::Cancelled),
        ),
    )
    .await
    .expect("cancel");
    assert_eq!(outcome.parcel.status, ParcelStatus::Cancelled);

    let qr = state
        .qr_codes
        .get(&registration.qr.code)
        .await
        .expect("qr lookup");
    assert!(!qr.active);
}

#[tokio::test]
async fn failed_exception_leaves_a_draft_manifest() {
    let state = test_state();
    sorted_parcel(&state, "BRT-106").await;

    let created = manifest_commands::create_manifest(&state, manifest_create())
        .await
        .expect("manifest");
    let number = created.manifest.manifest_number.clone();
    let manifest = manifest_commands::add_parcel(
        &state,
        &number,
        ManifestAddParcel {
            parcel: "BRT-106".to_string(),
            scanned_by: "loader-3".to_string(),
        },
    )
    .await
    .expect("add parcel");
    assert_eq!(manifest.total_parcels, 1);

    let outcome = scan_commands::process_scan(
        &state,
        scan(
            "BRT-106",
            OperationType::ScanOut,
            Some(ParcelStatus::Failed),
        ),
    )
    .await
    .expect("exception scan");
    assert_eq!(outcome.parcel.status, ParcelStatus::Failed);
    assert!(outcome.parcel.manifest_id.is_none());

    let detail = backend_application::queries::manifest_queries::get_manifest(&state, &number)
        .await
        .expect("manifest detail");
    assert_eq!(detail.manifest.total_parcels, 0);
    assert!(detail.items.is_empty());
}

/// Fails the first transition with a stale write, standing in for a competing
/// operator slipping in between the read and the commit.
struct ContendedParcels {
    inner: Arc<RedbWarehouseStore>,
    conflicts: AtomicU32,
}

#[async_trait]
impl ParcelRepository for ContendedParcels {
    async fn insert(&self, parcel: &Parcel) -> Result<(), DomainError> {
        ParcelRepository::insert(self.inner.as_ref(), parcel).await
    }

    async fn get(&self, parcel_id: &str) -> Result<Parcel, DomainError> {
        ParcelRepository::get(self.inner.as_ref(), parcel_id).await
    }

    async fn get_by_tracking(&self, tracking_number: &str) -> Result<Parcel, DomainError> {
        self.inner.get_by_tracking(tracking_number).await
    }

    async fn apply_transition(
        &self,
        updated: &Parcel,
        expected_version: u64,
        operation: &Operation,
        detach_manifest: Option<&str>,
    ) -> Result<Operation, DomainError> {
        if self.conflicts.load(Ordering::SeqCst) > 0 {
            self.conflicts.fetch_sub(1, Ordering::SeqCst);
            return Err(DomainError::StaleState {
                expected: operation.from_status,
                actual: operation.from_status,
            });
        }
        self.inner
            .apply_transition(updated, expected_version, operation, detach_manifest)
            .await
    }

    async fn count_by_status(
        &self,
        station_id: &str,
    ) -> Result<HashMap<ParcelStatus, u64>, DomainError> {
        self.inner.count_by_status(station_id).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn stale_write_is_retried_with_a_re_read() {
    let store = Arc::new(RedbWarehouseStore::open_in_memory().expect("in-memory store"));
    let mut state = state_with_store(store.clone());
    state.parcels = Arc::new(ContendedParcels {
        inner: store,
        conflicts: AtomicU32::new(1),
    });

    let registration = register_one(&state, "BRT-111").await;
    let outcome = scan_commands::process_scan(
        &state,
        scan(&registration.qr.code, OperationType::ScanIn, None),
    )
    .await
    .expect("scan lands after retry");
    assert!(!outcome.duplicate);
    assert_eq!(outcome.parcel.status, ParcelStatus::InboundReceived);
    assert!(outcome.operation.is_some());

    let history = parcel_queries::parcel_history(&state, "BRT-111", None)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert!(state
        .metrics
        .render_prometheus()
        .contains("depot_stale_retries_total 1"));
}

#[tokio::test]
async fn station_snapshot_reflects_the_day() {
    let state = test_state();
    sorted_parcel(&state, "BRT-107").await;
    let registration = register_one(&state, "BRT-108").await;
    scan_commands::process_scan(
        &state,
        scan(&registration.qr.code, OperationType::ScanIn, None),
    )
    .await
    .expect("scan in");

    let created = manifest_commands::create_manifest(&state, manifest_create())
        .await
        .expect("manifest");
    manifest_commands::add_parcel(
        &state,
        &created.manifest.manifest_number,
        ManifestAddParcel {
            parcel: "BRT-107".to_string(),
            scanned_by: "loader-3".to_string(),
        },
    )
    .await
    .expect("add parcel");

    let snapshot = stats_queries::station_snapshot(&state, "ST-01")
        .await
        .expect("snapshot");
    assert_eq!(snapshot.station.id, "ST-01");
    assert_eq!(
        snapshot
            .parcels_by_status
            .get(&ParcelStatus::InboundReceived),
        Some(&1)
    );
    assert_eq!(
        snapshot.parcels_by_status.get(&ParcelStatus::Manifested),
        Some(&1)
    );
    assert_eq!(
        snapshot.operations_today.get(&OperationType::ScanIn),
        Some(&2)
    );
    assert_eq!(snapshot.open_manifests.manifests, 1);
    assert_eq!(snapshot.open_manifests.parcels, 1);

    let err = stats_queries::station_snapshot(&state, "ST-99")
        .await
        .expect_err("unknown station");
    assert!(matches!(err, AppError::Domain(DomainError::NotFound { .. })));
}
