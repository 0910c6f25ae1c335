//! Application state shared across handlers.

use crate::push::Coordinator;
use std::sync::Arc;
use stevedore_core::config::AppConfig;
use stevedore_storage::StorageAdapter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Object storage backend.
    pub storage: Arc<dyn StorageAdapter>,
    /// Push coordinator.
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn StorageAdapter>) -> Self {
        let coordinator = Arc::new(Coordinator::new(
            storage.clone(),
            config.server.chunk_size,
            config.server.presign_expiry(),
        ));
        Self {
            config: Arc::new(config),
            storage,
            coordinator,
        }
    }
}
