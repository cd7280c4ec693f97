use std::collections::HashMap;

use crate::value_objects::ParcelStatus;

/// Short-window idempotency cache for operator double-scans.
///
/// Keyed on `(code, target status)`: a second scan of the same code toward the
/// same target inside the window is absorbed as a duplicate instead of
/// producing a second ledger entry. Only committed scans are recorded, so a
/// rejected scan never shadows a later valid one. Entries outside the window
/// are dropped lazily on each record.
#[derive(Debug, Default)]
pub struct ScanGuard {
    seen: HashMap<(String, ParcelStatus), i64>,
}

impl ScanGuard {
    /// True when a committed scan of the same `(code, target)` pair landed
    /// inside the window.
    pub fn is_duplicate(
        &self,
        code: &str,
        target: ParcelStatus,
        now_ms: i64,
        window_ms: i64,
    ) -> bool {
        self.seen
            .get(&(code.to_string(), target))
            .map(|last| now_ms - *last <= window_ms)
            .unwrap_or(false)
    }

    /// Records a committed scan so the window can absorb its repeats.
    pub fn record(&mut self, code: &str, target: ParcelStatus, now_ms: i64, window_ms: i64) {
        self.cleanup(now_ms, window_ms);
        self.seen.insert((code.to_string(), target), now_ms);
    }

    fn cleanup(&mut self, now_ms: i64, window_ms: i64) {
        self.seen.retain(|_, last| now_ms - *last <= window_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW_MS: i64 = 10_000;

    #[test]
    fn repeat_scan_inside_window_is_duplicate() {
        let mut guard = ScanGuard::default();
        guard.record("BRT-1", ParcelStatus::InboundReceived, 1_000, WINDOW_MS);
        assert!(guard.is_duplicate("BRT-1", ParcelStatus::InboundReceived, 4_000, WINDOW_MS));
    }

    #[test]
    fn unrecorded_scan_is_never_a_duplicate() {
        let guard = ScanGuard::default();
        assert!(!guard.is_duplicate("BRT-1", ParcelStatus::Sorted, 1_000, WINDOW_MS));
    }

    #[test]
    fn different_target_is_not_duplicate() {
        let mut guard = ScanGuard::default();
        guard.record("BRT-1", ParcelStatus::InboundReceived, 1_000, WINDOW_MS);
        assert!(!guard.is_duplicate("BRT-1", ParcelStatus::Sorted, 2_000, WINDOW_MS));
    }

    #[test]
    fn window_expiry_allows_a_fresh_scan() {
        let mut guard = ScanGuard::default();
        guard.record("BRT-1", ParcelStatus::Sorted, 1_000, WINDOW_MS);
        assert!(!guard.is_duplicate("BRT-1", ParcelStatus::Sorted, 12_001, WINDOW_MS));
    }
}
