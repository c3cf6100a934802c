use crate::api::client::ApiClient;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;

pub async fn overview(api: &ApiClient) -> Envelope {
    api.get("/sentiment/overview/", RequestOptions::new()).await
}

pub async fn trends(api: &ApiClient, params: &[(&str, &str)]) -> Envelope {
    api.get("/sentiment/trends/", RequestOptions::new().with_query(params)).await
}

pub async fn regions(api: &ApiClient) -> Envelope {
    api.get("/sentiment/regions/", RequestOptions::new()).await
}
