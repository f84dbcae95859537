//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use fwdnet_core::{CancellationToken, CatalogSync, ForwardClient, SyncOptions};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Forward API client (catalog, detail and CRUD capabilities)
    pub client: Arc<ForwardClient>,
    /// Sync engine over the same client
    pub sync: CatalogSync,
    /// Root token; cancelling it cancels every running sync
    pub shutdown: CancellationToken,
    /// Tokens of syncs in progress, keyed by sync ID
    active_syncs: Mutex<HashMap<String, CancellationToken>>,
    next_sync_id: AtomicU64,
}

impl AppState {
    pub fn new(client: ForwardClient, concurrency: usize, shutdown: CancellationToken) -> Self {
        let client = Arc::new(client);
        let sync = CatalogSync::from_client(client.clone()).with_options(SyncOptions {
            concurrency,
            ..SyncOptions::default()
        });
        Self {
            client,
            sync,
            shutdown,
            active_syncs: Mutex::new(HashMap::new()),
            next_sync_id: AtomicU64::new(1),
        }
    }

    pub fn generate_sync_id(&self) -> String {
        format!("sync-{}", self.next_sync_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a sync. Returns `None` if the ID is already running.
    pub fn register_sync(&self, sync_id: &str) -> Option<CancellationToken> {
        let mut active = self.lock_syncs();
        if active.contains_key(sync_id) {
            return None;
        }
        let token = CancellationToken::new();
        active.insert(sync_id.to_string(), token.clone());
        Some(token)
    }

    pub fn finish_sync(&self, sync_id: &str) {
        self.lock_syncs().remove(sync_id);
    }

    /// Cancel a running sync. Returns false if no such sync is running.
    pub fn cancel_sync(&self, sync_id: &str) -> bool {
        match self.lock_syncs().get(sync_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_sync_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock_syncs().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn lock_syncs(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        // A panic while holding the lock leaves the map itself consistent
        self.active_syncs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build the router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(cors)
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    client: ForwardClient,
    concurrency: usize,
    shutdown: CancellationToken,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState::new(client, concurrency, shutdown));
    serve(state, host, port).await
}

/// Bind and serve `state` in the background.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwdnet_core::ForwardConfig;

    fn test_client() -> ForwardClient {
        ForwardClient::new(&ForwardConfig::new("http://127.0.0.1:9", "key", "secret")).unwrap()
    }

    #[tokio::test]
    async fn test_server_starts() {
        let addr = start_server(test_client(), 1, CancellationToken::new(), "127.0.0.1", 0)
            .await
            .unwrap();
        assert!(addr.port() > 0);
    }

    #[test]
    fn test_sync_registry() {
        let state = AppState::new(test_client(), 1, CancellationToken::new());

        let token = state.register_sync("a").unwrap();
        assert!(state.register_sync("a").is_none());
        assert_eq!(state.active_sync_ids(), vec!["a".to_string()]);

        assert!(state.cancel_sync("a"));
        assert!(token.is_cancelled());
        assert!(!state.cancel_sync("b"));

        state.finish_sync("a");
        assert!(state.active_sync_ids().is_empty());
        assert_ne!(state.generate_sync_id(), state.generate_sync_id());
    }
}
