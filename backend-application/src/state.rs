use std::sync::Arc;

use backend_domain::ports::{
    DeliveryNotifier, ManifestRepository, OperationRepository, ParcelRepository, QrRepository,
    StationDirectory,
};
use backend_domain::services::ScanGuard;
use backend_domain::RuntimeConfig;
use tokio::sync::Mutex;

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub parcels: Arc<dyn ParcelRepository>,
    pub operations: Arc<dyn OperationRepository>,
    pub manifests: Arc<dyn ManifestRepository>,
    pub qr_codes: Arc<dyn QrRepository>,
    pub stations: Arc<dyn StationDirectory>,
    pub notifier: Arc<dyn DeliveryNotifier>,
    pub scan_guard: Arc<Mutex<ScanGuard>>,
    pub metrics: Arc<Metrics>,
}
