use std::time::Duration;

use tracing::{debug, warn};

use backend_domain::ports::DeliveryProof;
use backend_domain::services::transitions;
use backend_domain::utils::current_millis;
use backend_domain::value_objects::{ParcelStatus, QrTargetKind};
use backend_domain::{DomainError, ManifestStatus, Operation, Parcel, ScanOutcome, ScanRequest};

use crate::{AppError, AppState};

/// Applies one scan event: resolve the code, validate the edge, then commit
/// the transition together with its ledger entry. Contention on the parcel
/// surfaces as a stale write and is retried with a re-read, bounded by config.
pub async fn process_scan(state: &AppState, request: ScanRequest) -> Result<ScanOutcome, AppError> {
    state.metrics.record_scan_request();

    let code = request.code.trim().to_string();
    if code.is_empty() {
        return Err(AppError::BadRequest("code must not be empty".to_string()));
    }
    if request.operator_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "operator_id must not be empty".to_string(),
        ));
    }

    let now = current_millis();
    let resolution = resolve_parcel(state, &code, &request.operator_id, now).await?;
    let mut parcel = resolution.parcel;
    let window_ms = (state.config.scan_dedup_window_seconds * 1000) as i64;

    let mut attempt: u32 = 0;
    let (updated, recorded) = loop {
        let target = match request.to_status {
            Some(status) => status,
            None => transitions::default_target(request.operation_type, parcel.status),
        };

        // Soft success for no-op transitions and double-scans inside the
        // window. The guard is consulted once; retries after a stale write
        // are the same logical scan.
        if parcel.status == target {
            state.metrics.record_scan_duplicate();
            return Ok(ScanOutcome {
                parcel,
                operation: None,
                duplicate: true,
            });
        }
        if attempt == 0 {
            let guard = state.scan_guard.lock().await;
            if guard.is_duplicate(&code, target, now, window_ms) {
                state.metrics.record_scan_duplicate();
                return Ok(ScanOutcome {
                    parcel,
                    operation: None,
                    duplicate: true,
                });
            }
        }
        if let Err(err) = transitions::validate(request.operation_type, parcel.status, target) {
            state.metrics.record_scan_rejected();
            return Err(err.into());
        }

        let mut updated = parcel.clone();
        updated.status = target;
        updated.station_id = request.station_id.clone();
        if request.sort_bin.is_some() {
            updated.sort_bin = request.sort_bin.clone();
        }
        if request.route_code.is_some() {
            updated.route_code = request.route_code.clone();
        }
        updated.version = parcel.version + 1;
        updated.updated_at = now;

        let detach = detach_decision(state, &parcel, target, &mut updated).await?;

        let operation = Operation {
            id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            operation_type: request.operation_type,
            parcel_id: parcel.id.clone(),
            tracking_number: parcel.tracking_number.clone(),
            station_id: request.station_id.clone(),
            operator_id: request.operator_id.clone(),
            scan_method: request.scan_method,
            from_status: parcel.status,
            to_status: target,
            sort_bin: request.sort_bin.clone(),
            route_code: request.route_code.clone(),
            notes: request.notes.clone(),
            photo_ref: request.photo_ref.clone(),
            signature_ref: request.signature_ref.clone(),
            created_at: now,
        };

        match state
            .parcels
            .apply_transition(&updated, parcel.version, &operation, detach.as_deref())
            .await
        {
            Ok(recorded) => break (updated, recorded),
            Err(err) if err.is_retryable() && attempt < state.config.stale_retry_attempts => {
                attempt += 1;
                state.metrics.record_stale_retry();
                debug!(
                    tracking = %parcel.tracking_number,
                    attempt, "stale parcel write, re-reading"
                );
                tokio::time::sleep(Duration::from_millis(state.config.stale_retry_delay_ms)).await;
                parcel = state.parcels.get(&parcel.id).await?;
            }
            Err(err) => {
                state.metrics.record_scan_rejected();
                return Err(err.into());
            }
        }
    };

    // The window learns a scan only once its transition committed; a rejected
    // scan must not absorb a later valid one.
    {
        let mut guard = state.scan_guard.lock().await;
        guard.record(&code, updated.status, now, window_ms);
    }

    if updated.status == ParcelStatus::Delivered {
        state.notifier.spawn_delivered(
            state.config.clone(),
            updated.clone(),
            DeliveryProof {
                operator_id: request.operator_id.clone(),
                delivered_at: now,
                photo_ref: request.photo_ref.clone(),
                signature_ref: request.signature_ref.clone(),
            },
        );
    }
    // Terminal parcels retire their labels. Deactivation is idempotent, so a
    // failure here is repaired by re-scanning.
    if updated.status.is_terminal() {
        if let Err(err) = state.qr_codes.deactivate_for(&updated.id).await {
            warn!(tracking = %updated.tracking_number, "qr deactivation failed: {}", err);
        }
    }

    state.metrics.record_scan_applied();
    Ok(ScanOutcome {
        parcel: updated,
        operation: Some(recorded),
        duplicate: false,
    })
}

pub(crate) struct ParcelResolution {
    pub parcel: Parcel,
    pub via_qr: bool,
}

/// A scanned code is either a bound QR code or a raw tracking number.
pub(crate) async fn resolve_parcel(
    state: &AppState,
    code: &str,
    operator_id: &str,
    now_ms: i64,
) -> Result<ParcelResolution, AppError> {
    match state.qr_codes.resolve(code, operator_id, now_ms).await {
        Ok(qr) => {
            if qr.target_kind != QrTargetKind::Parcel {
                return Err(AppError::BadRequest(format!(
                    "code '{}' targets a {}, not a parcel",
                    code, qr.target_kind
                )));
            }
            let parcel = state.parcels.get(&qr.target_id).await?;
            Ok(ParcelResolution {
                parcel,
                via_qr: true,
            })
        }
        Err(DomainError::NotFound { .. }) => {
            let parcel = state.parcels.get_by_tracking(code).await?;
            Ok(ParcelResolution {
                parcel,
                via_qr: false,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Exception transitions leave a draft manifest atomically; finalized and
/// later manifests keep the item for manual reconciliation. Arrival scans
/// (`inbound_received`) just release the link.
async fn detach_decision(
    state: &AppState,
    parcel: &Parcel,
    target: ParcelStatus,
    updated: &mut Parcel,
) -> Result<Option<String>, AppError> {
    let Some(manifest_id) = parcel.manifest_id.clone() else {
        return Ok(None);
    };
    match target {
        ParcelStatus::InboundReceived => {
            updated.manifest_id = None;
            Ok(None)
        }
        ParcelStatus::Failed | ParcelStatus::Returned => {
            let manifest = state.manifests.get(&manifest_id).await?;
            if manifest.status == ManifestStatus::Draft {
                updated.manifest_id = None;
                Ok(Some(manifest_id))
            } else {
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}
