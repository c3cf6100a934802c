use http::Method;
use serde_json::Value;

use crate::api::client::ApiClient;
use crate::api::params_key;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;
use crate::utils::constants::GROUP_COMPLAINTS;

pub async fn create(api: &ApiClient, payload: &Value) -> Envelope {
    api.mutate(Method::POST, "/complaints/", Some(payload), GROUP_COMPLAINTS).await
}

/// Listing depends on who asks (citizens see their own complaints), so it is keyed by
/// account and, like every account scoped group, only dropped by invalidation.
pub async fn list(api: &ApiClient, params: &[(&str, &str)]) -> Envelope {
    let key = api.account_key(GROUP_COMPLAINTS).with(params_key(params));
    api.cached_get(key, "/complaints/", RequestOptions::new().with_query(params), None)
        .await
}

pub async fn get(api: &ApiClient, id: &str) -> Envelope {
    api.get(&format!("/complaints/{}/", id), RequestOptions::new()).await
}

pub async fn update(api: &ApiClient, id: &str, payload: &Value) -> Envelope {
    api.mutate(Method::PATCH, &format!("/complaints/{}/", id), Some(payload), GROUP_COMPLAINTS).await
}

pub async fn heatmap(api: &ApiClient) -> Envelope {
    api.get("/complaints/heatmap/", RequestOptions::new()).await
}
