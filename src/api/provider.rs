//! Metadata provider diagnostics

use axum::{extract::State, Json};

use crate::models::PreflightResult;

/// Run the connectivity preflight against the metadata provider
#[utoipa::path(
    get,
    path = "/provider/preflight",
    tag = "provider",
    responses(
        (status = 200, description = "Preflight outcome; `ok` is false when the provider is unusable", body = PreflightResult)
    )
)]
pub async fn preflight(State(state): State<crate::AppState>) -> Json<PreflightResult> {
    Json(state.services.imports.preflight().await)
}
