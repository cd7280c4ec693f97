// Parcel status value object

use serde::{Deserialize, Serialize};

/// Canonical parcel lifecycle status.
///
/// Happy path: `Created → InboundReceived → Sorting → Sorted → Manifested →
/// OutForDelivery → Delivered`. `Failed` and `Returned` branch off from any
/// post-intake state; `Cancelled` is reachable only from `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    Created,
    InboundReceived,
    Sorting,
    Sorted,
    Manifested,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
    Cancelled,
}

impl ParcelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelStatus::Created => "created",
            ParcelStatus::InboundReceived => "inbound_received",
            ParcelStatus::Sorting => "sorting",
            ParcelStatus::Sorted => "sorted",
            ParcelStatus::Manifested => "manifested",
            ParcelStatus::OutForDelivery => "out_for_delivery",
            ParcelStatus::Delivered => "delivered",
            ParcelStatus::Failed => "failed",
            ParcelStatus::Returned => "returned",
            ParcelStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ParcelStatus::Delivered
                | ParcelStatus::Returned
                | ParcelStatus::Cancelled
                | ParcelStatus::Failed
        )
    }

    /// States after intake has been scanned; exception branches start here.
    pub fn is_post_intake(&self) -> bool {
        matches!(
            self,
            ParcelStatus::InboundReceived
                | ParcelStatus::Sorting
                | ParcelStatus::Sorted
                | ParcelStatus::Manifested
                | ParcelStatus::OutForDelivery
        )
    }
}

impl std::fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
