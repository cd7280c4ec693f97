use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::debug;

use backend_application::commands::scan_commands;
use backend_application::AppState;
use backend_domain::{ScanOutcome, ScanRequest};

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<ScanOutcome>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    debug!(code = %payload.code, operation = %payload.operation_type, "scan received");
    let outcome = scan_commands::process_scan(&state, payload).await?;
    Ok(Json(outcome))
}
