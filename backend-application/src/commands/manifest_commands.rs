use tracing::{info, warn};

use backend_domain::utils::{current_millis, today_compact};
use backend_domain::value_objects::{
    ManifestStatus, Money, OperationType, ParcelStatus, QrTargetKind, ScanMethod, Weight,
};
use backend_domain::{
    DomainError, Manifest, ManifestAddParcel, ManifestCreate, ManifestCreated, ManifestItem,
    Operation, QrCode,
};

use crate::commands::scan_commands::resolve_parcel;
use crate::{AppError, AppState};

/// Creates a draft manifest and binds its number as a scannable QR code.
pub async fn create_manifest(
    state: &AppState,
    payload: ManifestCreate,
) -> Result<ManifestCreated, AppError> {
    if payload.created_by.trim().is_empty() {
        return Err(AppError::BadRequest(
            "created_by must not be empty".to_string(),
        ));
    }
    if state.stations.get(&payload.origin_station_id).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "unknown station '{}'",
            payload.origin_station_id
        )));
    }
    if let Some(destination) = &payload.destination_station_id {
        if state.stations.get(destination).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "unknown station '{}'",
                destination
            )));
        }
    }

    let now = current_millis();
    let day = today_compact();
    let seq = state.manifests.next_number_seq(&day).await?;
    let manifest_number = format!("MF-{}-{:04}", day, seq);

    let manifest = Manifest {
        id: uuid::Uuid::new_v4().to_string(),
        manifest_number: manifest_number.clone(),
        manifest_type: payload.manifest_type,
        origin_station_id: payload.origin_station_id,
        destination_station_id: payload.destination_station_id,
        vehicle_plate: payload.vehicle_plate,
        driver_name: payload.driver_name,
        driver_phone: payload.driver_phone,
        status: ManifestStatus::Draft,
        total_parcels: 0,
        total_weight: Weight::ZERO,
        total_cod: Money::zero(state.config.default_currency),
        created_by: payload.created_by,
        created_at: now,
        finalized_at: None,
        dispatched_at: None,
        arrived_at: None,
        completed_at: None,
    };
    state.manifests.insert(&manifest).await?;

    // The printed manifest header carries its number as the code.
    let qr = QrCode::new(
        manifest_number,
        QrTargetKind::Manifest,
        manifest.id.clone(),
        None,
        now,
    );
    state.qr_codes.bind(&qr).await?;

    state.metrics.record_manifest_created();
    info!(number = %manifest.manifest_number, "manifest created");
    Ok(ManifestCreated { manifest, qr })
}

/// Attaches a parcel to a draft manifest: membership row, totals, the
/// `sorted → manifested` hop and its ledger entry commit as one transaction.
pub async fn add_parcel(
    state: &AppState,
    manifest_number: &str,
    payload: ManifestAddParcel,
) -> Result<Manifest, AppError> {
    let manifest = state.manifests.get_by_number(manifest_number).await?;
    if manifest.status != ManifestStatus::Draft {
        return Err(DomainError::NotDraft {
            manifest: manifest.manifest_number,
            status: manifest.status,
        }
        .into());
    }

    let now = current_millis();
    let resolution = resolve_parcel(state, payload.parcel.trim(), &payload.scanned_by, now).await?;
    let parcel = resolution.parcel;

    if let Some(holder_id) = state.manifests.active_manifest_for(&parcel.id).await? {
        // Report the holding manifest by its number, not its internal id.
        let holder = state.manifests.get(&holder_id).await?;
        return Err(DomainError::AlreadyManifested {
            parcel: parcel.tracking_number,
            manifest: holder.manifest_number,
        }
        .into());
    }
    // Only sorted parcels go onto a manifest; the aggregator is the sole
    // producer of the `manifested` status.
    if parcel.status != ParcelStatus::Sorted {
        return Err(DomainError::InvalidTransition {
            operation: OperationType::Load,
            from: parcel.status,
            to: ParcelStatus::Manifested,
        }
        .into());
    }

    let mut updated = parcel.clone();
    updated.status = ParcelStatus::Manifested;
    updated.manifest_id = Some(manifest.id.clone());
    updated.version = parcel.version + 1;
    updated.updated_at = now;

    let item = ManifestItem {
        manifest_id: manifest.id.clone(),
        parcel_id: parcel.id.clone(),
        tracking_number: parcel.tracking_number.clone(),
        scanned_at: now,
        scanned_by: payload.scanned_by.clone(),
    };
    let operation = attach_operation(&manifest, &parcel, &payload.scanned_by, resolution.via_qr, now);

    let manifest = state
        .manifests
        .add_item(&manifest.id, &item, &updated, parcel.version, &operation)
        .await?;
    Ok(manifest)
}

/// Reverses an attach while the manifest is still draft; the parcel returns
/// to `sorted`.
pub async fn remove_parcel(
    state: &AppState,
    manifest_number: &str,
    tracking_number: &str,
) -> Result<Manifest, AppError> {
    let manifest = state.manifests.get_by_number(manifest_number).await?;
    if manifest.status != ManifestStatus::Draft {
        return Err(DomainError::NotDraft {
            manifest: manifest.manifest_number,
            status: manifest.status,
        }
        .into());
    }

    let parcel = state.parcels.get_by_tracking(tracking_number).await?;
    if parcel.manifest_id.as_deref() != Some(manifest.id.as_str()) {
        return Err(AppError::BadRequest(format!(
            "parcel '{}' is not on manifest '{}'",
            tracking_number, manifest_number
        )));
    }

    let now = current_millis();
    let mut updated = parcel.clone();
    updated.status = ParcelStatus::Sorted;
    updated.manifest_id = None;
    updated.version = parcel.version + 1;
    updated.updated_at = now;

    let operation = Operation {
        id: uuid::Uuid::new_v4().to_string(),
        seq: 0,
        operation_type: OperationType::Unload,
        parcel_id: parcel.id.clone(),
        tracking_number: parcel.tracking_number.clone(),
        station_id: manifest.origin_station_id.clone(),
        operator_id: manifest.created_by.clone(),
        scan_method: ScanMethod::ManualEntry,
        from_status: parcel.status,
        to_status: ParcelStatus::Sorted,
        sort_bin: parcel.sort_bin.clone(),
        route_code: parcel.route_code.clone(),
        notes: Some(format!("removed from manifest {}", manifest.manifest_number)),
        photo_ref: None,
        signature_ref: None,
        created_at: now,
    };

    let manifest = state
        .manifests
        .remove_item(&manifest.id, &updated, parcel.version, &operation)
        .await?;
    Ok(manifest)
}

pub async fn finalize_manifest(state: &AppState, number: &str) -> Result<Manifest, AppError> {
    advance_manifest(state, number, ManifestStatus::Finalized).await
}

pub async fn dispatch_manifest(state: &AppState, number: &str) -> Result<Manifest, AppError> {
    advance_manifest(state, number, ManifestStatus::Dispatched).await
}

pub async fn arrive_manifest(state: &AppState, number: &str) -> Result<Manifest, AppError> {
    advance_manifest(state, number, ManifestStatus::Arrived).await
}

pub async fn complete_manifest(state: &AppState, number: &str) -> Result<Manifest, AppError> {
    let manifest = advance_manifest(state, number, ManifestStatus::Completed).await?;
    // Idempotent; a crash between commit and deactivation is repaired by
    // re-issuing the complete call.
    if let Err(err) = state.qr_codes.deactivate(&manifest.manifest_number).await {
        warn!(number = %manifest.manifest_number, "qr deactivation failed: {}", err);
    }
    Ok(manifest)
}

async fn advance_manifest(
    state: &AppState,
    number: &str,
    to: ManifestStatus,
) -> Result<Manifest, AppError> {
    let required = match to {
        ManifestStatus::Finalized => ManifestStatus::Draft,
        ManifestStatus::Dispatched => ManifestStatus::Finalized,
        ManifestStatus::Arrived => ManifestStatus::Dispatched,
        ManifestStatus::Completed => ManifestStatus::Arrived,
        ManifestStatus::Draft => {
            return Err(AppError::BadRequest(
                "manifests cannot be advanced to draft".to_string(),
            ))
        }
    };
    let manifest = state.manifests.get_by_number(number).await?;
    let now = current_millis();
    let require_items = to == ManifestStatus::Finalized;
    let manifest = state
        .manifests
        .advance(&manifest.id, required, to, now, require_items)
        .await?;
    info!(number = %manifest.manifest_number, stage = %to, "manifest advanced");
    Ok(manifest)
}

fn attach_operation(
    manifest: &Manifest,
    parcel: &backend_domain::Parcel,
    scanned_by: &str,
    via_qr: bool,
    now: i64,
) -> Operation {
    Operation {
        id: uuid::Uuid::new_v4().to_string(),
        seq: 0,
        operation_type: OperationType::Load,
        parcel_id: parcel.id.clone(),
        tracking_number: parcel.tracking_number.clone(),
        station_id: manifest.origin_station_id.clone(),
        operator_id: scanned_by.to_string(),
        scan_method: if via_qr {
            ScanMethod::QrScanner
        } else {
            ScanMethod::ManualEntry
        },
        from_status: parcel.status,
        to_status: ParcelStatus::Manifested,
        sort_bin: parcel.sort_bin.clone(),
        route_code: parcel.route_code.clone(),
        notes: Some(format!("added to manifest {}", manifest.manifest_number)),
        photo_ref: None,
        signature_ref: None,
        created_at: now,
    }
}
