use backend_domain::utils::{current_millis, day_bounds, today_date};
use backend_domain::{DomainError, StationSnapshot};

use crate::{AppError, AppState};

/// Derived-on-read station snapshot; nothing here touches stored counters.
pub async fn station_snapshot(
    state: &AppState,
    station_id: &str,
) -> Result<StationSnapshot, AppError> {
    let station = state
        .stations
        .get(station_id)
        .await?
        .ok_or_else(|| DomainError::not_found("station", station_id))?;

    let parcels_by_status = state.parcels.count_by_status(station_id).await?;
    let (from_ms, until_ms) = day_bounds(&today_date()).map_err(DomainError::Storage)?;
    let operations_today = state
        .operations
        .count_by_type(station_id, from_ms, until_ms)
        .await?;
    let open_manifests = state.manifests.open_totals_for_station(station_id).await?;

    Ok(StationSnapshot {
        station,
        parcels_by_status,
        operations_today,
        open_manifests,
        generated_at: current_millis(),
    })
}
