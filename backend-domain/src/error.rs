use thiserror::Error;

use crate::value_objects::{OperationType, ParcelStatus};

/// Error taxonomy for the warehouse core. Every variant is recoverable at the
/// call boundary; only `StaleState` is worth retrying automatically.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("qr code '{0}' already bound and active")]
    DuplicateCode(String),

    #[error("qr code '{0}' is deactivated")]
    InactiveCode(String),

    #[error("qr code '{0}' is past its expiry")]
    ExpiredCode(String),

    #[error("illegal transition {from} -> {to} for operation '{operation}'")]
    InvalidTransition {
        operation: OperationType,
        from: ParcelStatus,
        to: ParcelStatus,
    },

    #[error("stale parcel state: expected {expected}, found {actual}")]
    StaleState {
        expected: ParcelStatus,
        actual: ParcelStatus,
    },

    #[error("parcel '{parcel}' already belongs to manifest '{manifest}'")]
    AlreadyManifested { parcel: String, manifest: String },

    #[error("manifest '{manifest}' is {status}, items can only change while draft")]
    NotDraft {
        manifest: String,
        status: crate::value_objects::ManifestStatus,
    },

    #[error("manifest '{manifest}' is {status}, expected {expected}")]
    WrongManifestStatus {
        manifest: String,
        status: crate::value_objects::ManifestStatus,
        expected: crate::value_objects::ManifestStatus,
    },

    #[error("manifest '{0}' has no parcels")]
    EmptyManifest(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Callers may retry these after re-reading current state; everything else
    /// needs operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::StaleState { .. })
    }

    /// Stable machine-readable code surfaced to scanner clients.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "not_found",
            DomainError::DuplicateCode(_) => "duplicate_code",
            DomainError::InactiveCode(_) => "inactive_code",
            DomainError::ExpiredCode(_) => "expired_code",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::StaleState { .. } => "stale_state",
            DomainError::AlreadyManifested { .. } => "already_manifested",
            DomainError::NotDraft { .. } => "not_draft",
            DomainError::WrongManifestStatus { .. } => "wrong_manifest_status",
            DomainError::EmptyManifest(_) => "empty_manifest",
            DomainError::Validation(_) => "validation",
            DomainError::Storage(_) => "storage",
        }
    }
}
