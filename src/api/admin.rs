use http::Method;
use serde_json::json;

use crate::api::client::ApiClient;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;
use crate::utils::constants::GROUP_ADMIN_USERS;

pub async fn users(api: &ApiClient) -> Envelope {
    let key = api.account_key(GROUP_ADMIN_USERS);
    api.cached_get(key, "/admin/users/", RequestOptions::new(), None).await
}

pub async fn update_user_status(api: &ApiClient, user_id: &str, is_active: bool) -> Envelope {
    let body = json!({ "is_active": is_active });
    let path = format!("/admin/users/{}/", user_id);
    api.mutate(Method::PATCH, &path, Some(&body), GROUP_ADMIN_USERS).await
}

pub async fn delete_user(api: &ApiClient, user_id: &str) -> Envelope {
    let path = format!("/admin/users/{}/", user_id);
    api.mutate(Method::DELETE, &path, None, GROUP_ADMIN_USERS).await
}

pub async fn stats(api: &ApiClient) -> Envelope {
    api.get("/admin/stats/", RequestOptions::new()).await
}
