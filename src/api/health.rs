use crate::api::client::ApiClient;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;

/// Liveness probe; never triggers a token refresh
pub async fn check(api: &ApiClient) -> Envelope {
    api.get("/health/", RequestOptions::new().skip_auth_refresh()).await
}
