use crate::error::AppError;
use crate::services::orchestrator;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/backup/run", post(run_backup))
        .route("/api/sync/run", post(run_sync))
}

/// Manual backup cycle. Shares the scheduler's entry point; the call blocks
/// until the engine finishes and returns the full cycle outcome.
async fn run_backup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<orchestrator::CycleResult>, AppError> {
    Ok(Json(orchestrator::run_backup_cycle(&state).await))
}

async fn run_sync(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    orchestrator::run_manual_sync(&state).await?;
    Ok(Json(serde_json::json!({ "synced": true })))
}
