#[cfg(test)]
mod tests {
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    use crate::api::{complaints, health, schemes};
    use crate::cache::query_cache::{QueryCache, QueryKey};
    use crate::session::token_store::TokenStore;
    use crate::tests::common::{client_with_storage, test_config};
    use crate::session::storage::MemoryStorage;
    use crate::transport::client::RequestOptions;
    use crate::transport::envelope::{ApiError, Envelope, CODE_HTTP_STATUS, CODE_MALFORMED, CODE_NETWORK};
    use crate::api::client::ApiClient;
    use std::sync::Arc;

    fn client(server: &MockServer) -> ApiClient {
        client_with_storage(&server.url("/api"), Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn unreachable_backend_yields_failure_envelope() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client_with_storage(&format!("http://{}/api", addr), Arc::new(MemoryStorage::new()));
        api.store().set_access_token(Some("t1".to_owned())).await;

        let envelope = schemes::list(&api, &[]).await;
        assert!(!envelope.success);
        assert_eq!(envelope.data, None);
        assert_eq!(envelope.error_code(), Some(CODE_NETWORK));
        assert!(!envelope.error_message().unwrap().is_empty());
        // a transport failure is not a 401; credentials are untouched
        assert_eq!(api.store().access_token().await.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn application_errors_pass_through_verbatim() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/complaints/");
                then.status(400).json_body(json!({
                    "success": false,
                    "error": {"message": "Title is required", "code": "validation"}
                }));
            })
            .await;

        let api = client(&server);
        let envelope = complaints::create(&api, &json!({"description": "pothole"})).await;

        mock.assert_async().await;
        assert_eq!(
            envelope,
            Envelope::failure(ApiError {
                message: "Title is required".to_owned(),
                code: Some("validation".to_owned()),
            })
        );
    }

    #[tokio::test]
    async fn query_and_bearer_reach_the_backend_and_reads_are_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/schemes/")
                    .query_param("category", "health")
                    .header("authorization", "Bearer t1");
                then.status(200)
                    .json_body(json!({"success": true, "data": [{"id": 4, "name": "Ayushman Bharat"}]}));
            })
            .await;

        let api = client(&server);
        api.store().set_access_token(Some("t1".to_owned())).await;

        let first = schemes::list(&api, &[("category", "health")]).await;
        let second = schemes::list(&api, &[("category", "health")]).await;

        assert_eq!(first.data.as_ref().unwrap()[0]["id"], 4);
        assert_eq!(first, second);
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn bare_json_and_empty_bodies_are_wrapped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/health/");
                then.status(200).json_body(json!({"status": "ok"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/empty/");
                then.status(204);
            })
            .await;

        let api = client(&server);
        assert_eq!(health::check(&api).await, Envelope::ok(json!({"status": "ok"})));
        assert_eq!(api.get("/empty/", RequestOptions::new()).await, Envelope::empty());
    }

    #[tokio::test]
    async fn non_json_bodies_become_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/regions/");
                then.status(502).body("<html>Bad Gateway</html>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/sentiment/overview/");
                then.status(200).body("not json");
            })
            .await;

        let api = client(&server);

        let gateway = api.get("/regions/", RequestOptions::new()).await;
        assert!(!gateway.success);
        assert_eq!(gateway.error_message(), Some("Request failed with status code 502"));
        assert_eq!(gateway.error_code(), Some(CODE_HTTP_STATUS));

        let garbage = api.get("/sentiment/overview/", RequestOptions::new()).await;
        assert!(!garbage.success);
        assert_eq!(garbage.error_code(), Some(CODE_MALFORMED));
    }

    #[tokio::test]
    async fn plain_error_bodies_use_detail_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/stats/");
                then.status(403)
                    .json_body(json!({"detail": "You do not have permission to perform this action."}));
            })
            .await;

        let api = client(&server);
        let envelope = api.get("/admin/stats/", RequestOptions::new()).await;
        assert!(!envelope.success);
        assert_eq!(
            envelope.error_message(),
            Some("You do not have permission to perform this action.")
        );
    }

    #[tokio::test]
    async fn account_scoped_reads_ignore_default_ttl() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/complaints/");
                then.status(200).json_body(json!({"success": true, "data": [{"id": 1}]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/schemes/");
                then.status(200).json_body(json!({"success": true, "data": [{"id": 4}]}));
            })
            .await;

        let mut config = test_config(&server.url("/api"));
        config.cache.default_ttl_seconds = Some(60);
        let store = Arc::new(TokenStore::new(Arc::new(MemoryStorage::new())));
        let api = ApiClient::new(&config, store, QueryCache::new()).unwrap();

        assert!(complaints::list(&api, &[]).await.success);
        assert!(schemes::list(&api, &[]).await.success);

        let complaint_key = api.account_key("complaints").with("all");
        let complaint_entry = api.cache().entry(&complaint_key).await.unwrap();
        assert_eq!(complaint_entry.expires_at, None);

        let scheme_key = QueryKey::new("schemes").with("list").with("all");
        let scheme_entry = api.cache().entry(&scheme_key).await.unwrap();
        assert!(scheme_entry.expires_at.is_some());
    }
}
