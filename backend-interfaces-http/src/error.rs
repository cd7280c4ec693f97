use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use backend_domain::DomainError;

#[derive(Debug)]
pub enum HttpError {
    Unauthorized,
    BadRequest(String),
    Domain(DomainError),
    Internal(String),
}

impl From<backend_application::AppError> for HttpError {
    fn from(value: backend_application::AppError) -> Self {
        match value {
            backend_application::AppError::Unauthorized => HttpError::Unauthorized,
            backend_application::AppError::BadRequest(msg) => HttpError::BadRequest(msg),
            backend_application::AppError::Domain(err) => HttpError::Domain(err),
            backend_application::AppError::Internal(err) => HttpError::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

/// 404 for missing entities, 409 for the conflict family (stale writes are
/// flagged retryable), 422 for state-machine and manifest-lifecycle
/// violations, 400 for validation.
fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::DuplicateCode(_)
        | DomainError::InactiveCode(_)
        | DomainError::ExpiredCode(_)
        | DomainError::StaleState { .. }
        | DomainError::AlreadyManifested { .. } => StatusCode::CONFLICT,
        DomainError::InvalidTransition { .. }
        | DomainError::NotDraft { .. }
        | DomainError::WrongManifestStatus { .. }
        | DomainError::EmptyManifest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "unauthorized".to_string(),
                    code: "unauthorized",
                    retryable: false,
                },
            ),
            HttpError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: format!("bad request: {}", msg),
                    code: "bad_request",
                    retryable: false,
                },
            ),
            HttpError::Domain(err) => (
                domain_status(&err),
                ErrorBody {
                    error: err.to_string(),
                    code: err.code(),
                    retryable: err.is_retryable(),
                },
            ),
            HttpError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: msg,
                    code: "internal",
                    retryable: false,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::value_objects::{OperationType, ParcelStatus};

    #[test]
    fn stale_state_maps_to_retryable_conflict() {
        let err = DomainError::StaleState {
            expected: ParcelStatus::Sorted,
            actual: ParcelStatus::Manifested,
        };
        assert_eq!(domain_status(&err), StatusCode::CONFLICT);
        assert!(err.is_retryable());
    }

    #[test]
    fn illegal_edges_are_unprocessable() {
        let err = DomainError::InvalidTransition {
            operation: OperationType::Sort,
            from: ParcelStatus::Created,
            to: ParcelStatus::Sorted,
        };
        assert_eq!(domain_status(&err), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!err.is_retryable());
    }
}
