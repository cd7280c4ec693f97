use backend_domain::{Operation, Parcel};

use crate::{AppError, AppState};

pub async fn get_parcel(state: &AppState, tracking_number: &str) -> Result<Parcel, AppError> {
    let parcel = state.parcels.get_by_tracking(tracking_number).await?;
    Ok(parcel)
}

/// Ledger entries for one parcel, newest-first.
pub async fn parcel_history(
    state: &AppState,
    tracking_number: &str,
    limit: Option<usize>,
) -> Result<Vec<Operation>, AppError> {
    let parcel = state.parcels.get_by_tracking(tracking_number).await?;
    let limit = limit.unwrap_or(100).clamp(1, 500);
    let operations = state.operations.for_parcel(&parcel.id, limit).await?;
    Ok(operations)
}
