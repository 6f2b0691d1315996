use crate::error::AppError;
use crate::services::restore;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(history))
        .route("/restore", post(restore_snapshot))
        .route("/delete", post(delete_snapshot))
}

#[derive(Deserialize)]
struct HistoryQuery {
    path: String,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<restore::SnapshotView>>, AppError> {
    if query.path.is_empty() {
        return Err(AppError::BadRequest("path is required".into()));
    }
    Ok(Json(restore::history(&state, &query.path).await))
}

#[derive(Deserialize)]
struct RestoreBody {
    path: String,
    snapshot_id: String,
}

async fn restore_snapshot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RestoreBody>,
) -> Result<Json<restore::RestoreResult>, AppError> {
    if body.path.is_empty() || body.snapshot_id.is_empty() {
        return Err(AppError::BadRequest("path and snapshot_id are required".into()));
    }
    Ok(Json(restore::restore(&state, &body.path, &body.snapshot_id).await?))
}

#[derive(Deserialize)]
struct DeleteBody {
    snapshot_id: String,
    #[allow(dead_code)]
    path: Option<String>,
}

async fn delete_snapshot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeleteBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    restore::delete_snapshot(&state, &body.snapshot_id).await?;
    Ok(Json(serde_json::json!({ "deleted": body.snapshot_id })))
}
