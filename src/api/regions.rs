use crate::api::client::ApiClient;
use crate::cache::query_cache::QueryKey;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;
use crate::utils::constants::GROUP_REGIONS;

pub async fn list(api: &ApiClient) -> Envelope {
    let key = QueryKey::new(GROUP_REGIONS).with("list");
    api.cached_get(key, "/regions/", RequestOptions::new(), api.default_ttl()).await
}

pub async fn get(api: &ApiClient, id: &str) -> Envelope {
    api.get(&format!("/regions/{}/", id), RequestOptions::new()).await
}

pub async fn metrics(api: &ApiClient, id: &str) -> Envelope {
    api.get(&format!("/regions/{}/metrics/", id), RequestOptions::new()).await
}
