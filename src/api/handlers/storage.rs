use crate::AppState;
use crate::api::error::AppError;
use crate::services::quota::UsageSummary;
use crate::utils::auth::Claims;
use axum::{Extension, Json, extract::State};

#[utoipa::path(
    get,
    path = "/storage/usage",
    responses(
        (status = 200, description = "Storage usage of the caller", body = UsageSummary),
        (status = 401, description = "Unauthenticated")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "storage"
)]
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UsageSummary>, AppError> {
    let summary = state
        .entry_service
        .quota()
        .usage_summary(&claims.sub)
        .await;
    Ok(Json(summary))
}
