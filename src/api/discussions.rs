use http::Method;
use serde_json::Value;

use crate::api::client::ApiClient;
use crate::api::params_key;
use crate::cache::query_cache::QueryKey;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;
use crate::utils::constants::GROUP_DISCUSSIONS;

pub async fn list(api: &ApiClient, params: &[(&str, &str)]) -> Envelope {
    let key = QueryKey::new(GROUP_DISCUSSIONS).with(params_key(params));
    api.cached_get(key, "/discussions/", RequestOptions::new().with_query(params), api.default_ttl())
        .await
}

pub async fn create(api: &ApiClient, payload: &Value) -> Envelope {
    api.mutate(Method::POST, "/discussions/", Some(payload), GROUP_DISCUSSIONS).await
}

pub async fn get(api: &ApiClient, id: &str) -> Envelope {
    api.get(&format!("/discussions/{}/", id), RequestOptions::new()).await
}

pub async fn add_comment(api: &ApiClient, discussion_id: &str, payload: &Value) -> Envelope {
    let path = format!("/discussions/{}/comments/", discussion_id);
    api.mutate(Method::POST, &path, Some(payload), GROUP_DISCUSSIONS).await
}
