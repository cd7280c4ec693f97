use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use backend_application::{AppState, Metrics};
use backend_domain::services::ScanGuard;
use backend_infrastructure::{
    AppConfig, FileStationDirectory, RedbWarehouseStore, WebhookDeliveryNotifier,
};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new(config_path: Option<String>) -> Result<Self> {
        let config = AppConfig::load(config_path.as_deref()).await?;
        let runtime_config = config.to_runtime_config()?;

        let store = Arc::new(RedbWarehouseStore::open(&runtime_config.data_path)?);
        let stations = Arc::new(FileStationDirectory::load(&runtime_config.stations_path).await?);

        let state = AppState {
            config: runtime_config,
            parcels: store.clone(),
            operations: store.clone(),
            manifests: store.clone(),
            qr_codes: store,
            stations,
            notifier: Arc::new(WebhookDeliveryNotifier::new()),
            scan_guard: Arc::new(Mutex::new(ScanGuard::default())),
            metrics: Arc::new(Metrics::default()),
        };

        Ok(Self { state })
    }
}
