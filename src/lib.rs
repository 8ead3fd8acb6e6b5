pub mod api;
pub mod config;
pub mod db;
pub mod engine;

pub use db::DbPool;

use config::Config;
use engine::Engine;

pub struct AppState {
    pub config: Config,
    pub engine: Engine,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let engine = Engine::new(db, config.auth.token_ttl_days);
        Self { config, engine }
    }
}
