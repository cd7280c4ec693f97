use backend_domain::ManifestDetail;

use crate::{AppError, AppState};

pub async fn get_manifest(
    state: &AppState,
    manifest_number: &str,
) -> Result<ManifestDetail, AppError> {
    let manifest = state.manifests.get_by_number(manifest_number).await?;
    let items = state.manifests.items(&manifest.id).await?;
    Ok(ManifestDetail { manifest, items })
}
