//! Refresh coordination.
//!
//! A request that gets 401 calls [`RefreshCoordinator::recover`] with the
//! access generation it was sent under. Callers queue on one mutex; the first
//! performs the exchange, the rest find the generation already moved on and
//! reuse whatever that exchange produced. At most one exchange is ever in
//! flight.
//!
//! Login and logout do not wait for the guard. Instead the outcome of an
//! exchange is only applied if the access generation it started from is still
//! current; otherwise it belongs to a session that no longer exists and is
//! dropped.

use std::sync::Arc;

use http::Method;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::errors::AuthError;
use crate::auth::models::{RefreshRequest, RefreshedTokens};
use crate::cache::invalidation::InvalidationBridge;
use crate::observability::metrics::get_metrics;
use crate::session::token_store::TokenStore;
use crate::session::SessionState;
use crate::transport::client::{RequestOptions, Transport};
use crate::transport::envelope::{CODE_NETWORK, CODE_TIMEOUT};
use crate::utils::constants::AUTH_REFRESH_PATH;

static SUCCESS_MSG: &str = "success";
static FAILURE_MSG: &str = "failure";
static SHARED_MSG: &str = "shared";
static DISCARDED_MSG: &str = "discarded";

#[derive(Debug)]
pub struct RefreshCoordinator {
    transport: Arc<Transport>,
    store: Arc<TokenStore>,
    bridge: InvalidationBridge,
    /// Held for the whole exchange. Keeps the last terminal failure so that
    /// everyone who waited on it reports the same error.
    in_flight: Mutex<Option<AuthError>>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<Transport>, store: Arc<TokenStore>, bridge: InvalidationBridge) -> Self {
        Self {
            transport,
            store,
            bridge,
            in_flight: Mutex::new(None),
        }
    }

    /// Obtain a usable access token after a request sent under `seen_generation`
    /// (within session `seen_epoch`) was rejected.
    pub async fn recover(&self, seen_generation: u64, seen_epoch: u64) -> Result<String, AuthError> {
        self.run(seen_generation, seen_epoch, true).await
    }

    /// Refresh regardless of any rejected request, still through the shared guard.
    /// An unreachable backend leaves the stored session in place.
    pub async fn refresh_now(&self) -> Result<String, AuthError> {
        let epoch = self.store.session_epoch();
        let (_, generation) = self.store.access_snapshot().await;
        self.run(generation, epoch, false).await
    }

    async fn run(
        &self,
        seen_generation: u64,
        seen_epoch: u64,
        expire_when_unreachable: bool,
    ) -> Result<String, AuthError> {
        let metrics = get_metrics().await;
        let mut last_failure = self.in_flight.lock().await;

        let (current, generation) = self.store.access_snapshot().await;
        if generation != seen_generation {
            // someone refreshed (or gave up) while we were waiting
            metrics.refresh_exchanges.with_label_values(&[SHARED_MSG]).inc();
            return match current {
                // the token now in the store belongs to another session
                Some(_) if self.store.session_epoch() != seen_epoch => Err(AuthError::SessionChanged),
                Some(token) => {
                    debug!("reusing access token from generation {}", generation);
                    Ok(token)
                }
                None => Err(last_failure.clone().unwrap_or(AuthError::SessionExpired)),
            };
        }

        match self.exchange().await {
            Ok(tokens) => {
                // login or logout may have replaced the session during the exchange
                let installed = self
                    .store
                    .install_refreshed(generation, tokens.access.clone(), tokens.refresh.as_deref())
                    .await;
                if !installed {
                    metrics.refresh_exchanges.with_label_values(&[DISCARDED_MSG]).inc();
                    warn!("session changed during refresh, discarding exchanged tokens");
                    return Err(AuthError::SessionChanged);
                }
                metrics.refresh_exchanges.with_label_values(&[SUCCESS_MSG]).inc();
                *last_failure = None;
                info!("access token refreshed");
                Ok(tokens.access)
            }
            Err(err) if !err.is_terminal() && !expire_when_unreachable => {
                metrics.refresh_exchanges.with_label_values(&[FAILURE_MSG]).inc();
                warn!("token refresh failed, keeping stored session: {}", err);
                Err(err)
            }
            Err(err) => {
                metrics.refresh_exchanges.with_label_values(&[FAILURE_MSG]).inc();
                if !self.expire_session(generation).await {
                    metrics.refresh_exchanges.with_label_values(&[DISCARDED_MSG]).inc();
                    warn!("refresh failed for a session that no longer exists: {}", err);
                    return Err(AuthError::SessionChanged);
                }
                warn!("token refresh failed, ending session: {}", err);
                *last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn exchange(&self) -> Result<RefreshedTokens, AuthError> {
        let refresh = self
            .store
            .refresh_token()
            .ok_or(AuthError::MissingRefreshToken)?;

        let body = json!(RefreshRequest { refresh });
        let options = RequestOptions::new().skip_auth_refresh();
        let response = self
            .transport
            .send(Method::POST, AUTH_REFRESH_PATH, Some(&body), &options, None)
            .await;

        let envelope = response.envelope.decode::<RefreshedTokens>();
        match envelope.into_result() {
            Ok(Some(tokens)) if !tokens.access.is_empty() => Ok(tokens),
            Ok(_) => Err(AuthError::RefreshRejected("response carried no access token".to_owned())),
            Err(err) if response.status.is_none() && is_transport_code(err.code.as_deref()) => {
                Err(AuthError::Unreachable(err.message))
            }
            Err(err) => Err(AuthError::RefreshRejected(err.message)),
        }
    }

    /// Clear the session the failed exchange belonged to; false if it was already replaced
    async fn expire_session(&self, generation: u64) -> bool {
        if !self.store.clear_if(generation).await {
            return false;
        }
        self.bridge.on_session_expired().await;
        self.store.set_state(SessionState::Expired);
        get_metrics()
            .await
            .session_events
            .with_label_values(&["expired"])
            .inc();
        true
    }
}

fn is_transport_code(code: Option<&str>) -> bool {
    matches!(code, Some(CODE_NETWORK) | Some(CODE_TIMEOUT))
}
