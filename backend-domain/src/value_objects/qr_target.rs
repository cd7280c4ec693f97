// QR target value object

use serde::{Deserialize, Serialize};

/// The kind of entity a QR code points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrTargetKind {
    Parcel,
    Manifest,
    Station,
    User,
}

impl QrTargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrTargetKind::Parcel => "parcel",
            QrTargetKind::Manifest => "manifest",
            QrTargetKind::Station => "station",
            QrTargetKind::User => "user",
        }
    }
}

impl std::fmt::Display for QrTargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
