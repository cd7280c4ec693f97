use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::error;

use backend_application::commands::parcel_commands;
use backend_application::queries::parcel_queries;
use backend_application::AppState;
use backend_domain::{Operation, Parcel, ParcelRegistration};

use crate::error::HttpError;
use crate::middleware::{authorize, parse_intake};

#[derive(serde::Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn register_parcels(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<Vec<ParcelRegistration>>), HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let envelope = parse_intake(&headers, &body).map_err(|err| {
        error!("failed to parse intake body: {}", err);
        HttpError::BadRequest(err.to_string())
    })?;
    let registrations = parcel_commands::register_parcels(&state, envelope).await?;
    Ok((StatusCode::CREATED, Json(registrations)))
}

pub async fn get_parcel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tracking_number): Path<String>,
) -> Result<Json<Parcel>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let parcel = parcel_queries::get_parcel(&state, &tracking_number).await?;
    Ok(Json(parcel))
}

pub async fn parcel_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tracking_number): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Operation>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let history = parcel_queries::parcel_history(&state, &tracking_number, query.limit).await?;
    Ok(Json(history))
}
