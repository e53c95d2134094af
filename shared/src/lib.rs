pub mod types;
pub mod config;
pub mod error;
pub mod responses;
pub mod datastore;
pub mod identity;
pub mod sessions;
pub mod access;
pub mod analytics;
pub mod auth;
pub mod submissions;
pub mod users;
pub mod reports;

use config::Config;
use datastore::Datastore;
use sessions::{InMemorySessionStore, SessionManager, SessionStore};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub datastore: Datastore,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: Config, datastore: Datastore, store: Arc<dyn SessionStore>) -> Arc<Self> {
        let sessions = SessionManager::new(store, &config.session_secret, config.session_ttl());
        Arc::new(Self {
            config,
            datastore,
            sessions,
        })
    }

    /// State for a cold start: workbook from `DATA_PATH`, sessions in memory
    pub fn from_env() -> Arc<Self> {
        let config = Config::from_env();
        tracing::info!("Loading workbook from {}", config.data_path.display());
        let datastore = Datastore::open(config.data_path.clone());
        Self::new(config, datastore, Arc::new(InMemorySessionStore::new()))
    }
}
