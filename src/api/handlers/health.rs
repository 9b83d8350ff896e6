use crate::AppState;
use crate::services::storage::StorageError;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

/// Key looked up to check the object store; it never exists.
const HEALTH_CHECK_KEY: &str = "health-check";

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub media_schema: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_connected = state.db.ping().await.is_ok();

    let storage_status = match state.storage.file_exists(HEALTH_CHECK_KEY).await {
        Ok(_) => "connected",
        Err(e) if StorageError::is_unavailable(&e) => "unreachable",
        Err(e) => {
            // Reachable but refusing requests, e.g. bad credentials
            tracing::warn!("Storage health check failed: {}", e);
            "error"
        }
    };

    let status = if db_connected && storage_status == "connected" {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: if db_connected {
            "connected"
        } else {
            "disconnected"
        }
        .to_string(),
        storage: storage_status.to_string(),
        media_schema: state.entry_service.media_schema().as_str().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
