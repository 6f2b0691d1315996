pub mod backup;
pub mod repo;
pub mod services;
pub mod settings;
pub mod snapshots;
pub mod sources;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/sources", sources::router())
        .nest("/api/snapshots", snapshots::router())
        .nest("/api/services", services::router())
        .merge(backup::router())
        .merge(repo::router())
        .merge(settings::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
