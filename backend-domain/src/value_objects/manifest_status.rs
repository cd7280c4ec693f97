use serde::{Deserialize, Serialize};

/// Manifest lifecycle. Each stage only accepts the strict predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Draft,
    Finalized,
    Dispatched,
    Arrived,
    Completed,
}

impl ManifestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestStatus::Draft => "draft",
            ManifestStatus::Finalized => "finalized",
            ManifestStatus::Dispatched => "dispatched",
            ManifestStatus::Arrived => "arrived",
            ManifestStatus::Completed => "completed",
        }
    }

    /// The stage this one may be advanced to, if any.
    pub fn successor(&self) -> Option<ManifestStatus> {
        match self {
            ManifestStatus::Draft => Some(ManifestStatus::Finalized),
            ManifestStatus::Finalized => Some(ManifestStatus::Dispatched),
            ManifestStatus::Dispatched => Some(ManifestStatus::Arrived),
            ManifestStatus::Arrived => Some(ManifestStatus::Completed),
            ManifestStatus::Completed => None,
        }
    }

    /// Completed manifests no longer claim their parcels.
    pub fn is_active(&self) -> bool {
        !matches!(self, ManifestStatus::Completed)
    }
}

impl std::fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestType {
    Delivery,
    Transfer,
    Return,
}

impl ManifestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestType::Delivery => "delivery",
            ManifestType::Transfer => "transfer",
            ManifestType::Return => "return",
        }
    }
}
