use serde::{Deserialize, Serialize};

use crate::value_objects::QrTargetKind;

/// A scannable code bound to exactly one entity. Codes are deactivated, never
/// deleted, so stale labels keep resolving to a useful error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCode {
    pub code: String,
    pub target_kind: QrTargetKind,
    pub target_id: String,
    pub scan_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scanned_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scanned_by: Option<String>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

impl QrCode {
    pub fn new(
        code: impl Into<String>,
        target_kind: QrTargetKind,
        target_id: impl Into<String>,
        expires_at: Option<i64>,
        now_ms: i64,
    ) -> Self {
        Self {
            code: code.into(),
            target_kind,
            target_id: target_id.into(),
            scan_count: 0,
            last_scanned_at: None,
            last_scanned_by: None,
            active: true,
            expires_at,
            created_at: now_ms,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.map(|at| now_ms >= at).unwrap_or(false)
    }
}
