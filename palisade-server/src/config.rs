use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub config_dir: PathBuf,
    pub db_path: PathBuf,
    /// Repository configuration file handed to every engine invocation.
    pub engine_config: PathBuf,
    pub engine_bin: String,
    pub supervisor_bin: String,
    /// All registered source paths must live under this mount point.
    pub host_root: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let config_dir = PathBuf::from(
            std::env::var("CONFIG_DIR").unwrap_or_else(|_| "/app/config".into()),
        );

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(51515),
            db_path: config_dir.join("palisade.db"),
            engine_config: config_dir.join("repository.config"),
            config_dir,
            engine_bin: std::env::var("ENGINE_BIN").unwrap_or_else(|_| "kopia".into()),
            supervisor_bin: std::env::var("SUPERVISOR_BIN").unwrap_or_else(|_| "docker".into()),
            host_root: PathBuf::from(
                std::env::var("HOST_ROOT").unwrap_or_else(|_| "/host".into()),
            ),
        }
    }
}
