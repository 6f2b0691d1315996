//! Invocation layer for the subordinate backup engine (kopia).
//!
//! The engine is a black box: every operation is one CLI invocation against
//! a fixed repository configuration file, optionally carrying the repository
//! passphrase in `KOPIA_PASSWORD`. The engine owns snapshot storage,
//! chunking and encryption; this layer only reports exit status and captured
//! output.

pub mod policy;
pub mod snapshot;

use crate::models::cloud::CloudConfig;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio::sync::{Mutex, MutexGuard};

pub const PASSWORD_ENV: &str = "KOPIA_PASSWORD";

/// Outcome of one subordinate-process invocation. A process that could not
/// be spawned is folded into `ok = false` with the error text in `stderr`,
/// so callers handle every failure through the same shape.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    /// Diagnostic text for the operator: stderr when present, else stdout.
    pub fn error_text(&self) -> String {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim().to_string()
        } else {
            err.to_string()
        }
    }
}

pub struct Engine {
    bin: String,
    config_file: PathBuf,
    /// Serializes repository writes (snapshot create/restore/delete, sync,
    /// repository create/connect, rescue). The engine's own on-disk locking
    /// is not relied upon for concurrent local writers; callers acquire this
    /// through [`Engine::begin_write`] for the duration of a write sequence.
    write_lock: Mutex<()>,
}

impl Engine {
    pub fn new(bin: impl Into<String>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            config_file: config_file.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Single-flight guard for repository write operations. Hold the guard
    /// across every invocation of a multi-step write sequence (a backup
    /// cycle, a restore, the whole rescue procedure).
    pub async fn begin_write(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Runs `<bin> --config-file <cfg> <args…>` and captures its output.
    /// Never returns an error: spawn failures become `ok = false`.
    pub async fn run(&self, args: &[String], env: &[(String, String)]) -> CmdOutput {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--config-file")
            .arg(&self.config_file)
            .args(args)
            .kill_on_drop(true);
        for (k, v) in env {
            cmd.env(k, v);
        }

        match cmd.output().await {
            Ok(out) => CmdOutput {
                ok: out.status.success(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            },
            Err(e) => {
                tracing::error!(bin = %self.bin, error = %e, "Failed to spawn engine process");
                CmdOutput {
                    ok: false,
                    stdout: String::new(),
                    stderr: format!("failed to start {}: {}", self.bin, e),
                }
            }
        }
    }

    // ── Repository ──

    pub async fn repository_status(&self) -> CmdOutput {
        self.run(&args(&["repository", "status", "--json"]), &[]).await
    }

    pub async fn repository_create_filesystem(&self, path: &str, env: &[(String, String)]) -> CmdOutput {
        self.run(&args(&["repository", "create", "filesystem", "--path", path]), env)
            .await
    }

    pub async fn repository_connect_filesystem(&self, path: &str, env: &[(String, String)]) -> CmdOutput {
        self.run(&args(&["repository", "connect", "filesystem", "--path", path]), env)
            .await
    }

    pub async fn repository_create_s3(&self, cloud: &CloudConfig, env: &[(String, String)]) -> CmdOutput {
        let mut a = args(&["repository", "create"]);
        a.extend(s3_args(cloud));
        self.run(&a, env).await
    }

    pub async fn repository_connect_s3(&self, cloud: &CloudConfig, env: &[(String, String)]) -> CmdOutput {
        let mut a = args(&["repository", "connect"]);
        a.extend(s3_args(cloud));
        self.run(&a, env).await
    }

    pub async fn repository_sync_to(&self, cloud: &CloudConfig) -> CmdOutput {
        let mut a = args(&["repository", "sync-to"]);
        a.extend(s3_args(cloud));
        self.run(&a, &[]).await
    }

    // ── Policies ──

    pub async fn policy_set_compression(&self, path: &str) -> CmdOutput {
        self.run(&args(&["policy", "set", path, "--compression", "zstd"]), &[])
            .await
    }

    pub async fn policy_add_ignore(&self, path: &str, relative_rule: &str) -> CmdOutput {
        self.run(&args(&["policy", "set", path, "--add-ignore", relative_rule]), &[])
            .await
    }

    pub async fn policy_set_global_retention(&self, keep_latest: u32, env: &[(String, String)]) -> CmdOutput {
        let keep = keep_latest.to_string();
        self.run(
            &args(&["policy", "set", "--global", "--keep-latest", keep.as_str()]),
            env,
        )
        .await
    }

    pub async fn policy_list(&self) -> CmdOutput {
        self.run(&args(&["policy", "list", "--json"]), &[]).await
    }

    pub async fn policy_get(&self, path: &str) -> CmdOutput {
        self.run(&args(&["policy", "get", path, "--json"]), &[]).await
    }

    pub async fn policy_delete(&self, path: &str) -> CmdOutput {
        self.run(&args(&["policy", "delete", path]), &[]).await
    }

    // ── Snapshots ──

    /// One create call for the full set of paths; per-source atomicity is
    /// whatever the engine provides.
    pub async fn snapshot_create(&self, paths: &[String]) -> CmdOutput {
        let mut a = args(&["snapshot", "create"]);
        a.extend(paths.iter().cloned());
        self.run(&a, &[]).await
    }

    /// Without a path this lists the connected user's own snapshots across
    /// all of its sources.
    pub async fn snapshot_list(&self, path: Option<&str>) -> CmdOutput {
        let mut a = args(&["snapshot", "list"]);
        if let Some(path) = path {
            a.push(path.into());
        }
        a.push("--json".into());
        self.run(&a, &[]).await
    }

    /// Every snapshot across all sources and all history.
    pub async fn snapshot_list_all(&self, env: &[(String, String)]) -> CmdOutput {
        self.run(&args(&["snapshot", "list", "--json", "--all"]), env).await
    }

    pub async fn snapshot_restore(&self, snapshot_id: &str, target_path: &str, env: &[(String, String)]) -> CmdOutput {
        self.run(&args(&["snapshot", "restore", snapshot_id, target_path]), env)
            .await
    }

    pub async fn snapshot_delete(&self, snapshot_id: &str) -> CmdOutput {
        self.run(&args(&["snapshot", "delete", snapshot_id, "--delete"]), &[])
            .await
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// `s3 --bucket … --access-key … --secret-access-key …` with endpoint and
/// region appended only when configured, shared by connect/create/sync-to.
fn s3_args(cloud: &CloudConfig) -> Vec<String> {
    let mut a = args(&[
        "s3",
        "--bucket",
        cloud.bucket.as_str(),
        "--access-key",
        cloud.access_key.as_str(),
        "--secret-access-key",
        cloud.secret_key.as_str(),
    ]);
    if let Some(endpoint) = cloud.endpoint.as_deref().filter(|s| !s.is_empty()) {
        a.push("--endpoint".into());
        a.push(endpoint.into());
    }
    if let Some(region) = cloud.region.as_deref().filter(|s| !s.is_empty()) {
        a.push("--region".into());
        a.push(region.into());
    }
    a
}

pub fn password_env(password: &str) -> Vec<(String, String)> {
    vec![(PASSWORD_ENV.to_string(), password.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(endpoint: Option<&str>, region: Option<&str>) -> CloudConfig {
        CloudConfig {
            provider: "s3".into(),
            bucket: "backups".into(),
            access_key: "AK".into(),
            secret_key: "SK".into(),
            endpoint: endpoint.map(Into::into),
            region: region.map(Into::into),
        }
    }

    #[test]
    fn test_s3_args_minimal() {
        let a = s3_args(&cloud(None, None));
        assert_eq!(
            a,
            vec![
                "s3",
                "--bucket",
                "backups",
                "--access-key",
                "AK",
                "--secret-access-key",
                "SK"
            ]
        );
    }

    #[test]
    fn test_s3_args_full() {
        let a = s3_args(&cloud(Some("minio.local:9000"), Some("eu-west-1")));
        assert!(a
            .windows(2)
            .any(|w| w[0] == "--endpoint" && w[1] == "minio.local:9000"));
        assert!(a.windows(2).any(|w| w[0] == "--region" && w[1] == "eu-west-1"));
    }

    #[test]
    fn test_s3_args_empty_strings_skipped() {
        let a = s3_args(&cloud(Some(""), Some("")));
        assert!(!a.iter().any(|s| s == "--endpoint"));
        assert!(!a.iter().any(|s| s == "--region"));
    }

    #[tokio::test]
    async fn test_run_captures_exit_status() {
        let engine = Engine::new("true", "/tmp/test-repository.config");
        assert!(engine.run(&args(&["repository", "status"]), &[]).await.ok);

        let engine = Engine::new("false", "/tmp/test-repository.config");
        assert!(!engine.run(&args(&["repository", "status"]), &[]).await.ok);
    }

    #[tokio::test]
    async fn test_run_spawn_failure_folds_into_output() {
        let engine = Engine::new("/nonexistent/engine-bin", "/tmp/test-repository.config");
        let out = engine.run(&args(&["repository", "status"]), &[]).await;
        assert!(!out.ok);
        assert!(out.stderr.contains("failed to start"));
    }

    #[test]
    fn test_error_text_prefers_stderr() {
        let out = CmdOutput {
            ok: false,
            stdout: "partial output\n".into(),
            stderr: "repository not found\n".into(),
        };
        assert_eq!(out.error_text(), "repository not found");

        let out = CmdOutput {
            ok: false,
            stdout: "only stdout".into(),
            stderr: "  ".into(),
        };
        assert_eq!(out.error_text(), "only stdout");
    }
}
