//! Server test harness.

use super::gateway::gateway_router;
use std::future::IntoFuture;
use std::sync::Arc;
use stevedore_core::config::{AppConfig, StorageConfig};
use stevedore_server::{create_router, AppState};
use stevedore_storage::MemoryBackend;

/// A running server plus its storage gateway, both on ephemeral ports.
#[allow(dead_code)]
pub struct TestServer {
    /// Base URL of the push server.
    pub base_url: String,
    /// The storage backend, for direct assertions and seeding.
    pub storage: MemoryBackend,
    pub state: AppState,
}

#[allow(dead_code)]
impl TestServer {
    /// Spawn a server whose coordinator plans chunks of `chunk_size` bytes.
    pub async fn spawn(chunk_size: u64) -> Self {
        let gateway_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind gateway listener");
        let gateway_addr = gateway_listener.local_addr().expect("gateway addr");

        let storage = MemoryBackend::new(&format!("http://{gateway_addr}"));
        tokio::spawn(axum::serve(gateway_listener, gateway_router(storage.clone())).into_future());

        let mut config = AppConfig::for_testing();
        config.server.chunk_size = chunk_size;
        config.storage = StorageConfig::Memory {
            base_url: format!("http://{gateway_addr}"),
        };

        let state = AppState::new(config, Arc::new(storage.clone()));
        let router = create_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind server listener");
        let addr = listener.local_addr().expect("server addr");
        tokio::spawn(axum::serve(listener, router).into_future());

        Self {
            base_url: format!("http://{addr}"),
            storage,
            state,
        }
    }
}
