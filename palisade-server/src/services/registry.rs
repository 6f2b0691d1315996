//! Source registry: which paths are under backup management, their ignore
//! rules, and the dependent service linked to each.
//!
//! The registry has no table of its own. Sources live in the engine's
//! policy list (path + ignore rules); only the service link is persisted
//! locally. Listing joins the two.

use crate::engine::policy;
use crate::error::AppError;
use crate::models::service_link;
use crate::state::AppState;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub path: String,
    pub ignore_rules: Vec<String>,
    pub linked_service: Option<String>,
}

/// A registrable path is absolute and lives under the host mount root.
pub fn validate_source_path(path: &str, host_root: &Path) -> Result<(), String> {
    let p = Path::new(path);
    if !p.is_absolute() {
        return Err(format!("source path must be absolute: {path}"));
    }
    if !p.starts_with(host_root) {
        return Err(format!(
            "source path must live under {}: {path}",
            host_root.display()
        ));
    }
    Ok(())
}

/// Converts an absolute ignore target into a rule relative to its source
/// path. The target must be a strict descendant of the source.
pub fn relative_rule(source_path: &str, target: &str) -> Result<String, String> {
    let rel = Path::new(target)
        .strip_prefix(source_path)
        .map_err(|_| format!("{target} is not inside {source_path}"))?;
    if rel.as_os_str().is_empty() {
        return Err(format!("{target} is the source path itself"));
    }
    Ok(rel.to_string_lossy().into_owned())
}

/// Idempotent: re-registering refreshes the engine policy, it never
/// duplicates the source.
pub async fn register(state: &AppState, path: &str) -> Result<(), AppError> {
    validate_source_path(path, &state.config.host_root).map_err(AppError::BadRequest)?;

    let out = state.engine.policy_set_compression(path).await;
    if !out.ok {
        return Err(AppError::CommandExecution(out.error_text()));
    }
    tracing::info!(path = %path, "Source registered");
    Ok(())
}

pub async fn add_ignore_rule(state: &AppState, path: &str, target: &str) -> Result<String, AppError> {
    let rule = relative_rule(path, target).map_err(AppError::InvalidRule)?;

    let out = state.engine.policy_add_ignore(path, &rule).await;
    if !out.ok {
        return Err(AppError::CommandExecution(out.error_text()));
    }
    tracing::info!(path = %path, rule = %rule, "Ignore rule added");
    Ok(rule)
}

/// Removes the policy and the service link. Snapshots already taken for the
/// path remain in the repository.
pub async fn unregister(state: &AppState, path: &str) -> Result<(), AppError> {
    let out = state.engine.policy_delete(path).await;
    if !out.ok {
        return Err(AppError::CommandExecution(out.error_text()));
    }

    let db = state.db.clone();
    let p = path.to_string();
    tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        service_link::set(&conn, &p, None)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    tracing::info!(path = %path, "Source unregistered");
    Ok(())
}

pub async fn link_service(state: &AppState, path: &str, service: Option<&str>) -> Result<(), AppError> {
    let db = state.db.clone();
    let p = path.to_string();
    let s = service.map(str::to_string);
    tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        service_link::set(&conn, &p, s.as_deref())
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;
    Ok(())
}

/// All registered sources sorted by path. An engine failure or unparseable
/// policy output degrades to an empty listing (or empty rule set for one
/// source) instead of failing the call.
pub async fn list(state: &AppState) -> Result<Vec<Source>, AppError> {
    let listed = state.engine.policy_list().await;
    if !listed.ok {
        tracing::warn!(error = %listed.error_text(), "Engine policy list failed");
        return Ok(Vec::new());
    }
    let paths = policy::target_paths(&listed.stdout);

    let db = state.db.clone();
    let links = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        service_link::get_all(&conn)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let got = state.engine.policy_get(&path).await;
        let ignore_rules = if got.ok {
            policy::ignore_rules(&got.stdout)
        } else {
            tracing::warn!(path = %path, "Engine policy get failed, listing source without rules");
            Vec::new()
        };
        let linked_service = links.get(&path).cloned();
        sources.push(Source {
            path,
            ignore_rules,
            linked_service,
        });
    }
    // target_paths is already sorted; keep the invariant explicit.
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_source_path() {
        let root = Path::new("/host");
        assert!(validate_source_path("/host/var/www", root).is_ok());
        assert!(validate_source_path("/host", root).is_ok());
        assert!(validate_source_path("var/www", root).is_err());
        assert!(validate_source_path("/srv/www", root).is_err());
        // Component-wise, not a string prefix
        assert!(validate_source_path("/hostile/www", root).is_err());
    }

    #[test]
    fn test_relative_rule_descendant() {
        assert_eq!(
            relative_rule("/host/var/www", "/host/var/www/cache").unwrap(),
            "cache"
        );
        assert_eq!(
            relative_rule("/host/var/www", "/host/var/www/logs/old").unwrap(),
            "logs/old"
        );
    }

    #[test]
    fn test_relative_rule_rejects_outsiders() {
        assert!(relative_rule("/host/var/www", "/host/var/other").is_err());
        assert!(relative_rule("/host/var/www", "/host/var").is_err());
        // Equal path is not a descendant
        assert!(relative_rule("/host/var/www", "/host/var/www").is_err());
        // String-prefix trap
        assert!(relative_rule("/host/var/www", "/host/var/wwwroot/x").is_err());
    }
}
