use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use backend_application::commands::manifest_commands;
use backend_application::queries::manifest_queries;
use backend_application::AppState;
use backend_domain::{Manifest, ManifestAddParcel, ManifestCreate, ManifestCreated, ManifestDetail};

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn create_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ManifestCreate>,
) -> Result<(StatusCode, Json<ManifestCreated>), HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let created = manifest_commands::create_manifest(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Result<Json<ManifestDetail>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let detail = manifest_queries::get_manifest(&state, &number).await?;
    Ok(Json(detail))
}

pub async fn add_parcel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
    Json(payload): Json<ManifestAddParcel>,
) -> Result<Json<Manifest>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let manifest = manifest_commands::add_parcel(&state, &number, payload).await?;
    Ok(Json(manifest))
}

pub async fn remove_parcel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((number, tracking_number)): Path<(String, String)>,
) -> Result<Json<Manifest>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let manifest = manifest_commands::remove_parcel(&state, &number, &tracking_number).await?;
    Ok(Json(manifest))
}

pub async fn finalize_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Result<Json<Manifest>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let manifest = manifest_commands::finalize_manifest(&state, &number).await?;
    Ok(Json(manifest))
}

pub async fn dispatch_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Result<Json<Manifest>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let manifest = manifest_commands::dispatch_manifest(&state, &number).await?;
    Ok(Json(manifest))
}

pub async fn arrive_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Result<Json<Manifest>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let manifest = manifest_commands::arrive_manifest(&state, &number).await?;
    Ok(Json(manifest))
}

pub async fn complete_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Result<Json<Manifest>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let manifest = manifest_commands::complete_manifest(&state, &number).await?;
    Ok(Json(manifest))
}
