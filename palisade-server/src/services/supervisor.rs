//! Dependent-service lifecycle via the container supervisor CLI.
//!
//! Stop/start requests are fire-and-forget with a boolean success signal;
//! a supervisor failure never escalates beyond a log line.

use tokio::process::Command;

pub struct Supervisor {
    bin: String,
}

impl Supervisor {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn run(&self, args: &[&str]) -> (bool, String) {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args).kill_on_drop(true);
        match cmd.output().await {
            Ok(out) => (
                out.status.success(),
                String::from_utf8_lossy(&out.stdout).into_owned(),
            ),
            Err(e) => {
                tracing::error!(bin = %self.bin, error = %e, "Failed to spawn supervisor process");
                (false, String::new())
            }
        }
    }

    pub async fn stop(&self, name: &str) -> bool {
        let (ok, _) = self.run(&["stop", name]).await;
        if !ok {
            tracing::warn!(service = %name, "Supervisor stop request failed");
        }
        ok
    }

    pub async fn start(&self, name: &str) -> bool {
        let (ok, _) = self.run(&["start", name]).await;
        if !ok {
            tracing::warn!(service = %name, "Supervisor start request failed");
        }
        ok
    }

    /// Names of all managed services, running or not.
    pub async fn list(&self) -> Vec<String> {
        let (ok, out) = self.run(&["ps", "--format", "{{.Names}}", "-a"]).await;
        if !ok {
            return Vec::new();
        }
        out.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_boolean_outcome() {
        assert!(Supervisor::new("true").stop("svc").await);
        assert!(Supervisor::new("true").start("svc").await);
        assert!(!Supervisor::new("false").stop("svc").await);
        assert!(!Supervisor::new("false").start("svc").await);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_false() {
        let sup = Supervisor::new("/nonexistent/supervisor-bin");
        assert!(!sup.stop("svc").await);
        assert!(sup.list().await.is_empty());
    }
}
