use crate::error::AppError;
use crate::services::registry;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_sources).post(register_source).delete(unregister_source))
        .route("/ignore", post(add_ignore_rule))
        .route("/link", post(link_service))
}

async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<registry::Source>>, AppError> {
    Ok(Json(registry::list(&state).await?))
}

#[derive(Deserialize)]
struct RegisterBody {
    path: String,
}

async fn register_source(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<(axum::http::StatusCode, Json<serde_json::Value>), AppError> {
    if body.path.is_empty() {
        return Err(AppError::BadRequest("path is required".into()));
    }
    registry::register(&state, &body.path).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(serde_json::json!({ "registered": body.path })),
    ))
}

async fn unregister_source(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<axum::http::StatusCode, AppError> {
    registry::unregister(&state, &body.path).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct IgnoreBody {
    path: String,
    /// Absolute path of the file or directory to exclude; must live under
    /// `path`.
    target: String,
}

async fn add_ignore_rule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IgnoreBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rule = registry::add_ignore_rule(&state, &body.path, &body.target).await?;
    Ok(Json(serde_json::json!({ "path": body.path, "rule": rule })))
}

#[derive(Deserialize)]
struct LinkBody {
    path: String,
    /// Omitted or empty clears the association.
    service: Option<String>,
}

async fn link_service(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LinkBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    registry::link_service(&state, &body.path, body.service.as_deref()).await?;
    Ok(Json(serde_json::json!({
        "path": body.path,
        "service": body.service,
    })))
}
