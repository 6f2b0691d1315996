use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_services))
}

/// Names known to the container supervisor, for the operator to pick a
/// linked service from.
async fn list_services(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let services = state.supervisor.list().await;
    Json(serde_json::json!({ "services": services }))
}
