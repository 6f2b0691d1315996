//! Disaster-recovery bootstrap: rebuild local state purely from the remote.
//!
//! The procedure is linear with no checkpointing. It connects to the cloud
//! target with operator-supplied credentials, enumerates every snapshot the
//! remote knows, restores the newest snapshot of each source onto its
//! original path, and only then recreates a fresh local repository pointed
//! at the same remote. A failure before any restore leaves the installation
//! exactly as it was: without a usable local repository.

use crate::engine::{password_env, snapshot};
use crate::error::AppError;
use crate::models::cloud::{self, CloudConfig};
use crate::state::AppState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RescueRequest {
    /// Where the rebuilt repository stores its own metadata and index. The
    /// restored file content never goes here; it lands on the original
    /// source paths.
    pub repo_path: String,
    pub password: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl RescueRequest {
    fn cloud(&self) -> CloudConfig {
        CloudConfig {
            provider: "s3".into(),
            bucket: self.bucket.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RescueOutcome {
    pub attempted: usize,
    pub restored: usize,
    /// False after successful restores means the recovered data is on disk
    /// but the installation cannot run automatic backups yet.
    pub repo_rebuilt: bool,
    pub failures: Vec<RestoreFailure>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreFailure {
    pub path: String,
    pub error: String,
}

pub async fn rescue(state: &AppState, req: RescueRequest) -> Result<RescueOutcome, AppError> {
    let cloud_cfg = req.cloud();
    let env = password_env(&req.password);

    tracing::info!(bucket = %req.bucket, "Starting rescue from remote target");
    let _guard = state.engine.begin_write().await;

    // 1. Connect. Rejected credentials or an unreachable endpoint abort
    // the whole procedure.
    let connected = state.engine.repository_connect_s3(&cloud_cfg, &env).await;
    if !connected.ok {
        return Err(AppError::RemoteConnect(format!(
            "cannot connect to remote storage: {}",
            connected.error_text()
        )));
    }

    // 2. Enumerate all history and keep the newest snapshot per source.
    let listed = state.engine.snapshot_list_all(&env).await;
    let snaps = if listed.ok {
        snapshot::parse_list(&listed.stdout)
    } else {
        tracing::error!(error = %listed.error_text(), "Remote snapshot enumeration failed");
        Vec::new()
    };
    let targets = snapshot::latest_per_source(snaps);
    let attempted = targets.len();

    // 3. Restore each source in place. Failures are per-path and do not
    // block the rest.
    let mut restored = 0;
    let mut failures = Vec::new();
    for (path, snapshot_id) in targets {
        tracing::info!(path = %path, snapshot = %snapshot_id, "Restoring in place");
        let out = state.engine.snapshot_restore(&snapshot_id, &path, &env).await;
        if out.ok {
            restored += 1;
        } else {
            let error = out.error_text();
            tracing::error!(path = %path, error = %error, "In-place restore failed");
            failures.push(RestoreFailure { path, error });
        }
    }

    if restored == 0 {
        return Err(AppError::Restore(
            "no restorable snapshots found on the remote".into(),
        ));
    }

    // 4. Rebuild the local repository: discard stale metadata, recreate the
    // storage directory, initialize fresh.
    match tokio::fs::remove_file(state.engine.config_file()).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(error = %e, "Could not remove stale repository config");
        }
    }
    let _ = tokio::fs::remove_dir_all(&req.repo_path).await;
    if let Err(e) = tokio::fs::create_dir_all(&req.repo_path).await {
        return Ok(RescueOutcome {
            attempted,
            restored,
            repo_rebuilt: false,
            failures,
            error: Some(format!("cannot recreate repository directory: {e}")),
        });
    }

    let created = state
        .engine
        .repository_create_filesystem(&req.repo_path, &env)
        .await;
    if !created.ok {
        // Degraded: data recovered to disk, installation not yet usable.
        tracing::error!(error = %created.error_text(), "Local repository rebuild failed after restores");
        return Ok(RescueOutcome {
            attempted,
            restored,
            repo_rebuilt: false,
            failures,
            error: Some(created.error_text()),
        });
    }

    // 5. Persist the cloud target so future automatic replication points at
    // the same remote.
    let db = state.db.clone();
    let cfg = cloud_cfg.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        cloud::set(&conn, &cfg)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    tracing::info!(restored, attempted, "Rescue completed");
    Ok(RescueOutcome {
        attempted,
        restored,
        repo_rebuilt: true,
        failures,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::connection::create_pool;
    use crate::db::migrate::migrate;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_state(dir: &TempDir, engine_bin: &str) -> Arc<AppState> {
        let db_path = dir.path().join("test.db");
        let pool = create_pool(&db_path);
        migrate(&pool, dir.path()).unwrap();
        let config = AppConfig {
            port: 0,
            config_dir: dir.path().to_path_buf(),
            db_path,
            engine_config: dir.path().join("repository.config"),
            engine_bin: engine_bin.into(),
            supervisor_bin: "true".into(),
            host_root: "/host".into(),
        };
        Arc::new(AppState::new(pool, config))
    }

    fn request(dir: &TempDir) -> RescueRequest {
        RescueRequest {
            repo_path: dir.path().join("repo").to_string_lossy().into_owned(),
            password: "secret".into(),
            bucket: "backups".into(),
            access_key: "AK".into(),
            secret_key: "SK".into(),
            endpoint: None,
            region: None,
        }
    }

    #[tokio::test]
    async fn test_rescue_aborts_when_remote_unreachable() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        // Every engine call fails, so the connect stage is fatal.
        let state = test_state(&dir, "false");

        let err = rescue(&state, request(&dir)).await.unwrap_err();
        assert!(matches!(err, AppError::RemoteConnect(_)));
        assert!(!dir.path().join("repo").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_rescue_with_no_snapshots_is_hard_failure() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        // Connect succeeds but the enumeration yields nothing restorable.
        let state = test_state(&dir, "true");

        let err = rescue(&state, request(&dir)).await.unwrap_err();
        assert!(matches!(err, AppError::Restore(_)));
        // No local repository was created or replaced.
        assert!(!dir.path().join("repo").exists());

        let conn = state.db.get()?;
        assert!(crate::models::cloud::get(&conn)?.is_none());
        Ok(())
    }
}
