//! Point-in-time restore for a single source, with dependent-service
//! lifecycle coordination: stop the linked service, restore in place,
//! start the service again no matter what.

use crate::engine::snapshot;
use crate::error::AppError;
use crate::models::service_link;
use crate::state::AppState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub success: bool,
    pub error: Option<String>,
    /// The linked service, when one was associated with the source.
    pub service: Option<String>,
    /// Whether the post-restore start request succeeded. With
    /// `success == false` and `service_restarted == true` the service is
    /// running on its pre-restore data.
    pub service_restarted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub id: String,
    pub short_id: String,
    pub time: String,
    pub size: String,
    pub files: u64,
}

pub async fn restore(state: &AppState, path: &str, snapshot_id: &str) -> Result<RestoreResult, AppError> {
    let db = state.db.clone();
    let p = path.to_string();
    let linked = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        service_link::get(&conn, &p)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    if let Some(name) = &linked {
        tracing::info!(service = %name, path = %path, "Stopping linked service before restore");
        if !state.supervisor.stop(name).await {
            tracing::warn!(service = %name, "Proceeding with restore despite failed stop request");
        }
    }

    let guard = state.engine.begin_write().await;
    let out = state.engine.snapshot_restore(snapshot_id, path, &[]).await;
    drop(guard);

    // The linked service is started again even when the restore failed: it
    // must never be left stopped. The flag in the result is the operator's
    // only signal of which data it is now running on.
    let mut service_restarted = false;
    if let Some(name) = &linked {
        service_restarted = state.supervisor.start(name).await;
        if !service_restarted {
            tracing::error!(service = %name, "Failed to start linked service after restore");
        }
    }

    if out.ok {
        tracing::info!(path = %path, snapshot = %snapshot_id, "Restore completed");
    } else {
        tracing::error!(path = %path, snapshot = %snapshot_id, error = %out.error_text(), "Restore failed");
    }

    Ok(RestoreResult {
        success: out.ok,
        error: (!out.ok).then(|| out.error_text()),
        service: linked,
        service_restarted,
    })
}

/// Permanently deletes one snapshot. Best effort: the engine error is
/// surfaced to the caller, nothing is retried.
pub async fn delete_snapshot(state: &AppState, snapshot_id: &str) -> Result<(), AppError> {
    let _guard = state.engine.begin_write().await;
    let out = state.engine.snapshot_delete(snapshot_id).await;
    if !out.ok {
        return Err(AppError::CommandExecution(out.error_text()));
    }
    tracing::info!(snapshot = %snapshot_id, "Snapshot deleted");
    Ok(())
}

/// Snapshot history for one source, newest first. Engine or parse failures
/// degrade to an empty listing.
pub async fn history(state: &AppState, path: &str) -> Vec<SnapshotView> {
    let out = state.engine.snapshot_list(Some(path)).await;
    if !out.ok {
        tracing::warn!(path = %path, error = %out.error_text(), "Snapshot list failed");
        return Vec::new();
    }

    let mut snaps = snapshot::parse_list(&out.stdout);
    snaps.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    snaps
        .into_iter()
        .map(|s| SnapshotView {
            short_id: snapshot::short_id(&s.id),
            time: snapshot::display_time(&s.start_time),
            size: snapshot::format_size(s.stats.total_size),
            files: s.stats.file_count,
            id: s.id,
        })
        .collect()
}
