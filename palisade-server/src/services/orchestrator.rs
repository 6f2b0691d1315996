//! The backup cycle: one engine snapshot-create call across every
//! registered source, followed by cloud replication when a target is
//! configured, followed by exactly one outcome notification.
//!
//! Manual runs and scheduler-triggered runs share this entry point; the
//! engine's write lock serializes overlapping invocations.

use crate::error::AppError;
use crate::models::cloud;
use crate::services::registry;
use crate::state::AppState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    /// Number of sources included in the cycle; zero means the cycle was a
    /// no-op (nothing registered, engine never invoked).
    pub sources: usize,
    pub local_success: bool,
    pub sync_attempted: bool,
    pub sync_success: bool,
    pub error: Option<String>,
}

impl CycleResult {
    fn empty() -> Self {
        Self {
            sources: 0,
            local_success: true,
            sync_attempted: false,
            sync_success: false,
            error: None,
        }
    }
}

pub async fn run_backup_cycle(state: &AppState) -> CycleResult {
    let sources = match registry::list(state).await {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("failed to list sources: {e}");
            tracing::error!(error = %msg, "Backup cycle aborted");
            let result = CycleResult {
                sources: 0,
                local_success: false,
                sync_attempted: false,
                sync_success: false,
                error: Some(msg),
            };
            notify_outcome(state, &result).await;
            return result;
        }
    };

    if sources.is_empty() {
        tracing::info!("Backup cycle skipped: no sources registered");
        return CycleResult::empty();
    }

    let paths: Vec<String> = sources.into_iter().map(|s| s.path).collect();
    let count = paths.len();
    tracing::info!(sources = count, "Starting backup cycle");

    let guard = state.engine.begin_write().await;

    let created = state.engine.snapshot_create(&paths).await;
    if !created.ok {
        drop(guard);
        let result = CycleResult {
            sources: count,
            local_success: false,
            sync_attempted: false,
            sync_success: false,
            error: Some(created.error_text()),
        };
        tracing::error!(error = %created.error_text(), "Local snapshot failed");
        notify_outcome(state, &result).await;
        return result;
    }

    let db = state.db.clone();
    let cloud_cfg = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        cloud::get(&conn)
    })
    .await
    .ok()
    .and_then(|r| r.ok())
    .flatten();

    let result = match cloud_cfg {
        None => CycleResult {
            sources: count,
            local_success: true,
            sync_attempted: false,
            sync_success: false,
            error: None,
        },
        Some(cfg) => {
            tracing::info!(bucket = %cfg.bucket, "Replicating repository to cloud target");
            let synced = state.engine.repository_sync_to(&cfg).await;
            if !synced.ok {
                tracing::error!(error = %synced.error_text(), "Cloud sync failed");
            }
            CycleResult {
                sources: count,
                local_success: true,
                sync_attempted: true,
                sync_success: synced.ok,
                error: (!synced.ok).then(|| synced.error_text()),
            }
        }
    };
    drop(guard);

    notify_outcome(state, &result).await;
    result
}

/// Manual replication of the local repository to the stored cloud target,
/// outside a backup cycle.
pub async fn run_manual_sync(state: &AppState) -> Result<(), AppError> {
    let db = state.db.clone();
    let cfg = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        cloud::get(&conn)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??
    .ok_or_else(|| AppError::BadRequest("no cloud target configured".into()))?;

    let _guard = state.engine.begin_write().await;
    let synced = state.engine.repository_sync_to(&cfg).await;
    drop(_guard);

    if synced.ok {
        state.notifier.send(&state.db, "Manual cloud sync completed", true).await;
        Ok(())
    } else {
        let err = synced.error_text();
        state
            .notifier
            .send(&state.db, &format!("Manual cloud sync failed: {err}"), false)
            .await;
        Err(AppError::CommandExecution(err))
    }
}

/// One notification per cycle, describing which of the four outcomes
/// happened. No-op cycles (zero sources) never reach this.
async fn notify_outcome(state: &AppState, result: &CycleResult) {
    let (message, is_success) = summarize(result);
    state.notifier.send(&state.db, &message, is_success).await;
}

fn summarize(result: &CycleResult) -> (String, bool) {
    let err = result.error.as_deref().unwrap_or("unknown error");
    if !result.local_success {
        (format!("Backup failed: {err}"), false)
    } else if !result.sync_attempted {
        ("Backup cycle completed: local snapshot OK".into(), true)
    } else if result.sync_success {
        (
            "Backup cycle completed: local snapshot OK + cloud sync OK".into(),
            true,
        )
    } else {
        (
            format!("Backup completed locally but cloud sync failed: {err}"),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(local: bool, attempted: bool, synced: bool, error: Option<&str>) -> CycleResult {
        CycleResult {
            sources: 1,
            local_success: local,
            sync_attempted: attempted,
            sync_success: synced,
            error: error.map(Into::into),
        }
    }

    #[test]
    fn test_summarize_local_only_success() {
        let (msg, ok) = summarize(&result(true, false, false, None));
        assert!(ok);
        assert!(msg.contains("local snapshot OK"));
        assert!(!msg.contains("cloud"));
    }

    #[test]
    fn test_summarize_full_success() {
        let (msg, ok) = summarize(&result(true, true, true, None));
        assert!(ok);
        assert!(msg.contains("cloud sync OK"));
    }

    #[test]
    fn test_summarize_local_failure() {
        let (msg, ok) = summarize(&result(false, false, false, Some("disk full")));
        assert!(!ok);
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_summarize_degraded_sync_failure() {
        let (msg, ok) = summarize(&result(true, true, false, Some("bucket gone")));
        assert!(!ok);
        assert!(msg.contains("locally"));
        assert!(msg.contains("bucket gone"));
    }
}
