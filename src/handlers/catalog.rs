use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::services::catalog;
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let services = catalog::list_services(&state.db).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "count": services.len(),
        "services": services,
    })))
}
