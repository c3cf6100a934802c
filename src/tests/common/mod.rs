// shared helpers for the mock-backend tests
pub use axum::{Json, Router};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::Arc;

use http::HeaderMap;

use crate::api::client::ApiClient;
use crate::cache::query_cache::QueryCache;
use crate::config::settings::{ApiConfig, ClientConfig};
use crate::session::storage::{DurableStorage, MemoryStorage};
use crate::session::token_store::TokenStore;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        api: ApiConfig {
            base_url: base_url.to_owned(),
            timeout_ms: Some(5_000),
            user_agent: None,
        },
        ..ClientConfig::default()
    }
}

pub fn client_with_storage(base_url: &str, storage: Arc<dyn DurableStorage>) -> ApiClient {
    let store = Arc::new(TokenStore::new(storage));
    ApiClient::new(&test_config(base_url), store, QueryCache::new()).expect("api client")
}

/// Client against `http://{addr}/api` backed by in-memory storage
pub fn memory_client(addr: SocketAddr) -> (ApiClient, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let client = client_with_storage(&format!("http://{}/api", addr), storage.clone());
    (client, storage)
}

/// Token from an `Authorization: Bearer ...` header
pub fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}
