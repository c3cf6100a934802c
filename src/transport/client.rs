use std::time::Duration;

use anyhow::Result;
use http::{Method, StatusCode};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::settings::ApiConfig;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::transport::envelope::{normalize, ApiError, Envelope, CODE_MALFORMED, CODE_NETWORK, CODE_TIMEOUT};

static ERROR_MSG: &str = "error";

/// Per-request knobs
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Do not run the refresh-and-retry path on 401 (auth endpoints)
    pub skip_auth_refresh: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn with_query(mut self, params: &[(&str, &str)]) -> Self {
        self.query
            .extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn skip_auth_refresh(mut self) -> Self {
        self.skip_auth_refresh = true;
        self
    }
}

/// Outcome of one HTTP exchange. `status` is `None` when no response arrived.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: Option<StatusCode>,
    pub envelope: Envelope,
}

impl TransportResponse {
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED)
    }
}

/// Thin HTTP wrapper: bearer injection plus envelope normalization.
/// Never returns a raw error; every failure becomes a failure envelope.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(api.timeout());
        if let Some(user_agent) = &api.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        Ok(Self {
            client: builder.build()?,
            base_url: api.base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        access_token: Option<&str>,
    ) -> TransportResponse {
        let metrics = get_metrics().await;
        let start = get_instant();
        let url = self.url(path);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (key, value) in &options.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        debug!("{} {} (authorized: {})", method, url, access_token.is_some());
        let result = match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(bytes) => TransportResponse {
                        status: Some(status),
                        envelope: normalize(status, &bytes),
                    },
                    Err(err) => {
                        warn!("{} {}: reading body failed: {}", method, url, err);
                        metrics.transport_failures.with_label_values(&[CODE_MALFORMED]).inc();
                        TransportResponse {
                            status: Some(status),
                            envelope: Envelope::failure(ApiError::with_code(err.to_string(), CODE_MALFORMED)),
                        }
                    }
                }
            }
            Err(err) => {
                let reason = classify(&err);
                warn!("{} {} failed ({}): {}", method, url, reason, err);
                metrics.transport_failures.with_label_values(&[reason]).inc();
                TransportResponse {
                    status: None,
                    envelope: Envelope::failure(ApiError::with_code(describe(&err), reason)),
                }
            }
        };

        let status_label = result
            .status
            .map(|s| s.as_u16().to_string())
            .unwrap_or_else(|| ERROR_MSG.to_owned());
        metrics
            .api_requests
            .with_label_values(&[method.as_str(), status_label.as_str()])
            .inc();
        metrics
            .api_request_duration
            .with_label_values(&[method.as_str()])
            .observe(start.elapsed().as_secs_f64());
        result
    }
}

fn classify(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        CODE_TIMEOUT
    } else if err.is_decode() {
        CODE_MALFORMED
    } else {
        CODE_NETWORK
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Request timed out".to_owned()
    } else if err.is_connect() {
        format!("Network error: {}", err)
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> Transport {
        Transport::new(&ApiConfig {
            base_url: base_url.to_owned(),
            timeout_ms: Some(2_000),
            user_agent: None,
        })
        .unwrap()
    }

    #[test]
    fn joins_urls() {
        let t = transport("http://localhost:8000/api/");
        assert_eq!(t.url("/documents/"), "http://localhost:8000/api/documents/");
        assert_eq!(t.url("documents/"), "http://localhost:8000/api/documents/");
        assert_eq!(t.url("https://other.example/x"), "https://other.example/x");
    }

    #[tokio::test]
    async fn connection_refused_becomes_failure_envelope() {
        // bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let t = transport(&format!("http://{}/api", addr));
        let response = t
            .send(Method::GET, "/schemes/", None, &RequestOptions::new(), Some("t1"))
            .await;

        assert_eq!(response.status, None);
        assert!(!response.envelope.success);
        assert!(!response.envelope.error_message().unwrap_or_default().is_empty());
        assert_eq!(response.envelope.error_code(), Some(CODE_NETWORK));
    }

    #[test]
    fn options_builder() {
        let options = RequestOptions::new()
            .query("page", 2)
            .with_query(&[("status", "open")])
            .header("X-Trace", "1")
            .skip_auth_refresh();
        assert_eq!(options.query, vec![("page".into(), "2".into()), ("status".into(), "open".into())]);
        assert_eq!(options.headers.len(), 1);
        assert!(options.skip_auth_refresh);
    }
}
