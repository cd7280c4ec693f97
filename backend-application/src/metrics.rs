use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    scan_requests: AtomicU64,
    scans_applied: AtomicU64,
    scans_duplicate: AtomicU64,
    scans_rejected: AtomicU64,
    stale_retries: AtomicU64,
    parcels_registered: AtomicU64,
    manifests_created: AtomicU64,
}

impl Metrics {
    pub fn record_scan_request(&self) {
        self.scan_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_applied(&self) {
        self.scans_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_duplicate(&self) {
        self.scans_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_rejected(&self) {
        self.scans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_retry(&self) {
        self.stale_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parcels_registered(&self, count: usize) {
        self.parcels_registered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_manifest_created(&self) {
        self.manifests_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        let scan_requests = self.scan_requests.load(Ordering::Relaxed);
        let scans_applied = self.scans_applied.load(Ordering::Relaxed);
        let scans_duplicate = self.scans_duplicate.load(Ordering::Relaxed);
        let scans_rejected = self.scans_rejected.load(Ordering::Relaxed);
        let stale_retries = self.stale_retries.load(Ordering::Relaxed);
        let parcels_registered = self.parcels_registered.load(Ordering::Relaxed);
        let manifests_created = self.manifests_created.load(Ordering::Relaxed);

        format!(
            "# TYPE depot_scan_requests_total counter\n\
depot_scan_requests_total {}\n\
# TYPE depot_scans_applied_total counter\n\
depot_scans_applied_total {}\n\
# TYPE depot_scans_duplicate_total counter\n\
depot_scans_duplicate_total {}\n\
# TYPE depot_scans_rejected_total counter\n\
depot_scans_rejected_total {}\n\
# TYPE depot_stale_retries_total counter\n\
depot_stale_retries_total {}\n\
# TYPE depot_parcels_registered_total counter\n\
depot_parcels_registered_total {}\n\
# TYPE depot_manifests_created_total counter\n\
depot_manifests_created_total {}\n",
            scan_requests,
            scans_applied,
            scans_duplicate,
            scans_rejected,
            stale_retries,
            parcels_registered,
            manifests_created
        )
    }
}
