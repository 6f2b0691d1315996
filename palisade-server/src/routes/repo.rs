use crate::engine::{password_env, snapshot};
use crate::error::AppError;
use crate::models::cloud::CloudConfig;
use crate::services::rescue::{self, RescueRequest};
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/repo/create", post(create_repo))
        .route("/api/repo/rescue", post(run_rescue))
}

/// Storage location from `repository status --json`; the layout is engine
/// internal, so a parse miss degrades to a generic "Connected".
fn storage_path(json: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(json)
        .ok()?
        .pointer("/storage/config/path")?
        .as_str()
        .map(str::to_string)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    if !state.engine.config_file().exists() {
        return Json(serde_json::json!({ "connected": false }));
    }

    let out = state.engine.repository_status().await;
    if !out.ok {
        return Json(serde_json::json!({ "connected": false }));
    }
    let repo_path = storage_path(&out.stdout).unwrap_or_else(|| "Connected".into());

    let listed = state.engine.snapshot_list(None).await;
    let last_backup = snapshot::parse_list(&listed.stdout)
        .into_iter()
        .map(|s| s.start_time)
        .max()
        .map(|t| snapshot::display_time(&t))
        .unwrap_or_else(|| "Never".into());

    Json(serde_json::json!({
        "connected": true,
        "repo_path": repo_path,
        "last_backup": last_backup,
    }))
}

#[derive(Deserialize)]
struct CreateRepoBody {
    /// "filesystem" or "s3".
    provider: String,
    password: String,
    path: Option<String>,
    bucket: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    endpoint: Option<String>,
    region: Option<String>,
}

const DEFAULT_KEEP_LATEST: u32 = 5;

/// Initializes the repository: create, falling back to connect when the
/// storage already holds one, then apply the default global retention.
async fn create_repo(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRepoBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.password.is_empty() {
        return Err(AppError::BadRequest("password is required".into()));
    }
    let env = password_env(&body.password);

    let _guard = state.engine.begin_write().await;

    let out = match body.provider.as_str() {
        "filesystem" => {
            let path = body
                .path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::BadRequest("path is required for filesystem".into()))?;
            let created = state.engine.repository_create_filesystem(path, &env).await;
            if created.ok {
                created
            } else {
                state.engine.repository_connect_filesystem(path, &env).await
            }
        }
        "s3" => {
            let cloud = CloudConfig {
                provider: "s3".into(),
                bucket: body
                    .bucket
                    .clone()
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| AppError::BadRequest("bucket is required for s3".into()))?,
                access_key: body.access_key.clone().unwrap_or_default(),
                secret_key: body.secret_key.clone().unwrap_or_default(),
                endpoint: body.endpoint.clone(),
                region: body.region.clone(),
            };
            let created = state.engine.repository_create_s3(&cloud, &env).await;
            if created.ok {
                created
            } else {
                state.engine.repository_connect_s3(&cloud, &env).await
            }
        }
        other => {
            return Err(AppError::BadRequest(format!("unknown provider: {other}")));
        }
    };

    if !out.ok {
        return Err(AppError::CommandExecution(out.error_text()));
    }

    let retention = state
        .engine
        .policy_set_global_retention(DEFAULT_KEEP_LATEST, &env)
        .await;
    if !retention.ok {
        tracing::warn!(error = %retention.error_text(), "Failed to apply default retention policy");
    }

    tracing::info!(provider = %body.provider, "Repository initialized");
    Ok(Json(serde_json::json!({ "connected": true })))
}

async fn run_rescue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RescueRequest>,
) -> Result<Json<rescue::RescueOutcome>, AppError> {
    if body.repo_path.is_empty() {
        return Err(AppError::BadRequest("repo_path is required".into()));
    }
    Ok(Json(rescue::rescue(&state, body).await?))
}
