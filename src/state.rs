use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::models::DriverStats;
use crate::services::ai::LlmProvider;
use crate::services::orders::{OrderStore, SqliteOrderStore};
use crate::services::sessions::SessionStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    // `None` when no generative backend is configured; replies degrade instead of failing.
    pub llm: Option<Box<dyn LlmProvider>>,
    pub orders: Box<dyn OrderStore>,
    pub sessions: SessionStore,
    pub stats: DriverStats,
}

impl AppState {
    pub fn new(config: AppConfig, conn: Connection, llm: Option<Box<dyn LlmProvider>>) -> Self {
        let db = Arc::new(Mutex::new(conn));
        Self {
            orders: Box::new(SqliteOrderStore::new(db.clone())),
            sessions: SessionStore::new(db.clone(), &config),
            stats: DriverStats::default(),
            db,
            config,
            llm,
        }
    }
}
