use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use backend_application::queries::stats_queries;
use backend_application::AppState;
use backend_domain::StationSnapshot;

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn station_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(station_id): Path<String>,
) -> Result<Json<StationSnapshot>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let snapshot = stats_queries::station_snapshot(&state, &station_id).await?;
    Ok(Json(snapshot))
}
