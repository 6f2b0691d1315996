use crate::error::AppError;
use crate::models::cloud::{self, CloudConfig};
use crate::models::schedule::{self, Frequency};
use crate::models::settings;
use crate::services::notify;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub const KEY_RETENTION: &str = "retention_keep_latest";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/schedule", get(get_schedule).put(update_schedule))
        .route("/api/settings/retention", put(update_retention))
        .route("/api/settings/notifications", put(update_notifications))
        .route("/api/settings/cloud", put(update_cloud))
        .route("/api/notifications/test", post(test_notification))
}

async fn get_schedule(
    State(state): State<Arc<AppState>>,
) -> Result<Json<schedule::Schedule>, AppError> {
    let db = state.db.clone();
    let sched = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        schedule::load(&conn)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;
    Ok(Json(sched))
}

#[derive(Deserialize)]
struct ScheduleBody {
    frequency: String,
    time: String,
}

async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<schedule::Schedule>, AppError> {
    if !schedule::valid_time_of_day(&body.time) {
        return Err(AppError::BadRequest(format!(
            "time must be HH:MM, got {:?}",
            body.time
        )));
    }
    let frequency = Frequency::parse(&body.frequency);

    let db = state.db.clone();
    let time = body.time.clone();
    let sched = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        schedule::update(&conn, frequency, &time)?;
        schedule::load(&conn)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    tracing::info!(frequency = %frequency.as_str(), time = %body.time, "Schedule updated");
    Ok(Json(sched))
}

#[derive(Deserialize)]
struct RetentionBody {
    keep_latest: u32,
}

/// Applied globally through the engine, not per source.
async fn update_retention(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RetentionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.keep_latest == 0 {
        return Err(AppError::BadRequest("keep_latest must be positive".into()));
    }

    let out = state.engine.policy_set_global_retention(body.keep_latest, &[]).await;
    if !out.ok {
        return Err(AppError::CommandExecution(out.error_text()));
    }

    let db = state.db.clone();
    let value = body.keep_latest.to_string();
    tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        settings::set(&conn, KEY_RETENTION, &value)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    Ok(Json(serde_json::json!({ "keep_latest": body.keep_latest })))
}

#[derive(Deserialize)]
struct NotificationsBody {
    provider: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    chat_id: String,
    #[serde(default)]
    url: String,
}

async fn update_notifications(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NotificationsBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        settings::set(&conn, notify::KEY_PROVIDER, &body.provider)?;
        settings::set(&conn, notify::KEY_TOKEN, &body.token)?;
        settings::set(&conn, notify::KEY_CHAT_ID, &body.chat_id)?;
        settings::set(&conn, notify::KEY_URL, &body.url)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;
    Ok(Json(serde_json::json!({ "saved": true })))
}

#[derive(Deserialize)]
struct CloudBody {
    bucket: String,
    access_key: String,
    secret_key: String,
    endpoint: Option<String>,
    region: Option<String>,
}

async fn update_cloud(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CloudBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.bucket.is_empty() {
        return Err(AppError::BadRequest("bucket is required".into()));
    }

    let cfg = CloudConfig {
        provider: "s3".into(),
        bucket: body.bucket,
        access_key: body.access_key,
        secret_key: body.secret_key,
        endpoint: body.endpoint,
        region: body.region,
    };

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        cloud::set(&conn, &cfg)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;
    Ok(Json(serde_json::json!({ "saved": true })))
}

async fn test_notification(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let delivered = state.notifier.send(&state.db, "Test notification", true).await;
    Json(serde_json::json!({ "delivered": delivered }))
}
