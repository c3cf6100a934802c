use http::Method;

use crate::api::client::ApiClient;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;
use crate::utils::constants::GROUP_DOCUMENTS;

/// Documents of the current account. Cached per account, never by time.
pub async fn list(api: &ApiClient) -> Envelope {
    let key = api.account_key(GROUP_DOCUMENTS);
    api.cached_get(key, "/documents/", RequestOptions::new(), None).await
}

pub async fn delete(api: &ApiClient, id: &str) -> Envelope {
    api.mutate(Method::DELETE, &format!("/documents/{}/", id), None, GROUP_DOCUMENTS).await
}
