use backend_domain::{Operation, OperationQuery};

use crate::{AppError, AppState};

pub async fn list_operations(
    state: &AppState,
    mut query: OperationQuery,
) -> Result<Vec<Operation>, AppError> {
    query.limit = Some(query.limit.unwrap_or(100).clamp(1, 500));
    let operations = state.operations.query(&query).await?;
    Ok(operations)
}
