use crate::config::AppConfig;
use crate::db::connection::DbPool;
use crate::engine::Engine;
use crate::services::notify::Notifier;
use crate::services::supervisor::Supervisor;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub engine: Engine,
    pub notifier: Notifier,
    pub supervisor: Supervisor,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        let engine = Engine::new(config.engine_bin.clone(), config.engine_config.clone());
        let supervisor = Supervisor::new(config.supervisor_bin.clone());
        Self {
            db,
            config,
            engine,
            notifier: Notifier::new(),
            supervisor,
        }
    }
}
