use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// Ignore-rule target does not live under its source path.
    #[error("{0}")]
    InvalidRule(String),

    /// The subordinate engine or supervisor process failed to start or
    /// exited nonzero; carries its stderr for operator diagnosis.
    #[error("{0}")]
    CommandExecution(String),

    /// Remote storage rejected the credentials or is unreachable. Fatal to
    /// the rescue procedure.
    #[error("{0}")]
    RemoteConnect(String),

    #[error("{0}")]
    Restore(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::InvalidRule(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            AppError::CommandExecution(m) => (StatusCode::BAD_GATEWAY, m.clone()),
            AppError::RemoteConnect(m) => (StatusCode::BAD_GATEWAY, m.clone()),
            AppError::Restore(m) => (StatusCode::BAD_GATEWAY, m.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}
