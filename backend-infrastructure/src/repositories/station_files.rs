use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use backend_domain::ports::StationDirectory;
use backend_domain::{DomainError, Station};

/// File-backed station directory. Stations are reference data maintained
/// outside this service; the YAML file is read once at startup.
pub struct FileStationDirectory {
    stations: RwLock<Vec<Station>>,
}

impl FileStationDirectory {
    pub async fn load(path: &str) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let stations: Vec<Station> = serde_yaml::from_str(&content)?;
        info!(count = stations.len(), path, "station directory loaded");
        Ok(Self {
            stations: RwLock::new(stations),
        })
    }

    pub fn from_stations(stations: Vec<Station>) -> Self {
        Self {
            stations: RwLock::new(stations),
        }
    }
}

#[async_trait]
impl StationDirectory for FileStationDirectory {
    async fn get(&self, station_id: &str) -> Result<Option<Station>, DomainError> {
        let stations = self.stations.read().await;
        Ok(stations
            .iter()
            .find(|station| station.id == station_id)
            .cloned())
    }

    async fn all(&self) -> Result<Vec<Station>, DomainError> {
        Ok(self.stations.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_by_id() {
        let directory = FileStationDirectory::from_stations(vec![Station {
            id: "ST-01".to_string(),
            name: "Central Depot".to_string(),
            zone: Some("north".to_string()),
            capacity: Some(5_000),
        }]);
        let found = directory.get("ST-01").await.expect("lookup");
        assert_eq!(found.expect("station").name, "Central Depot");
        assert!(directory.get("ST-99").await.expect("lookup").is_none());
    }
}
