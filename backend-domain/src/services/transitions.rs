//! Legal-edge table of the parcel state machine.
//!
//! Each operation type owns a small set of edges; `failed` and `returned` are
//! exception targets reachable from any post-intake state under any operation
//! type, and `cancelled` is reachable only from `created`.

use crate::error::DomainError;
use crate::value_objects::{OperationType, ParcelStatus};

use ParcelStatus::*;

/// Whether `(from -> to)` is a permitted edge for `operation`.
pub fn permits(operation: OperationType, from: ParcelStatus, to: ParcelStatus) -> bool {
    if exception_edge(from, to) {
        return true;
    }
    let edges: &[(ParcelStatus, ParcelStatus)] = match operation {
        OperationType::ScanIn => &[(Created, InboundReceived)],
        OperationType::Sort => &[
            (InboundReceived, Sorting),
            (InboundReceived, Sorted),
            (Sorting, Sorted),
        ],
        OperationType::Load => &[(Manifested, OutForDelivery)],
        OperationType::ScanOut => &[
            (Sorted, OutForDelivery),
            (Manifested, OutForDelivery),
            (OutForDelivery, Delivered),
        ],
        OperationType::Unload => &[
            (Manifested, InboundReceived),
            (OutForDelivery, InboundReceived),
        ],
        OperationType::Transfer => &[
            (Manifested, OutForDelivery),
            (OutForDelivery, InboundReceived),
        ],
    };
    edges.contains(&(from, to))
}

/// Exception branches shared by every operation type.
fn exception_edge(from: ParcelStatus, to: ParcelStatus) -> bool {
    match to {
        Failed | Returned => from.is_post_intake(),
        Cancelled => from == Created,
        _ => false,
    }
}

/// Target status a scan implies when the request does not name one.
pub fn default_target(operation: OperationType, from: ParcelStatus) -> ParcelStatus {
    match operation {
        OperationType::ScanIn => InboundReceived,
        OperationType::Sort => Sorted,
        OperationType::Load => OutForDelivery,
        OperationType::ScanOut => {
            if from == OutForDelivery {
                Delivered
            } else {
                OutForDelivery
            }
        }
        OperationType::Unload => InboundReceived,
        OperationType::Transfer => {
            if from == OutForDelivery {
                InboundReceived
            } else {
                OutForDelivery
            }
        }
    }
}

/// Edge check that reports the offending edge on failure.
pub fn validate(
    operation: OperationType,
    from: ParcelStatus,
    to: ParcelStatus,
) -> Result<(), DomainError> {
    if permits(operation, from, to) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition {
            operation,
            from,
            to,
        })
    }
}
