use serde_json::Value;

use crate::api::client::ApiClient;
use crate::api::params_key;
use crate::cache::query_cache::QueryKey;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;
use crate::utils::constants::GROUP_SCHEMES;

/// Scheme catalogue is public and shared across accounts, so it is cached with the default TTL.
pub async fn list(api: &ApiClient, params: &[(&str, &str)]) -> Envelope {
    let key = QueryKey::new(GROUP_SCHEMES).with("list").with(params_key(params));
    api.cached_get(key, "/schemes/", RequestOptions::new().with_query(params), api.default_ttl())
        .await
}

pub async fn get(api: &ApiClient, id: &str) -> Envelope {
    api.get(&format!("/schemes/{}/", id), RequestOptions::new()).await
}

pub async fn categories(api: &ApiClient) -> Envelope {
    let key = QueryKey::new(GROUP_SCHEMES).with("categories");
    api.cached_get(key, "/schemes/categories/", RequestOptions::new(), api.default_ttl())
        .await
}

pub async fn search(api: &ApiClient, filters: &Value) -> Envelope {
    api.post("/schemes/search/", filters).await
}
