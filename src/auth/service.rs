use http::Method;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::api::client::ApiClient;
use crate::auth::errors::AuthError;
use crate::auth::models::{AuthPayload, LoginRequest, LogoutRequest, RegisterRequest};
use crate::observability::metrics::get_metrics;
use crate::session::user::SessionUser;
use crate::session::SessionState;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::{ApiError, Envelope, CODE_MALFORMED};
use crate::utils::constants::{
    AUTH_LOGIN_PATH, AUTH_LOGOUT_PATH, AUTH_PROFILE_PATH, AUTH_REGISTER_PATH, GROUP_PROFILE,
};

/// Login, registration, logout and profile handling on top of [`ApiClient`].
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Envelope {
        let body = json!(credentials);
        self.authenticate(AUTH_LOGIN_PATH, &body, "login").await
    }

    pub async fn register(&self, data: &RegisterRequest) -> Envelope {
        let body = json!(data);
        self.authenticate(AUTH_REGISTER_PATH, &body, "register").await
    }

    /// Shared tail of login and registration. The backend envelope is returned as is.
    async fn authenticate(&self, path: &str, body: &Value, event: &str) -> Envelope {
        let options = RequestOptions::new().skip_auth_refresh();
        let envelope = self.api.request(Method::POST, path, Some(body), options).await;
        if !envelope.success {
            warn!("{} rejected: {}", event, envelope.error_message().unwrap_or_default());
            return envelope;
        }

        let payload = match envelope.clone().decode::<AuthPayload>().into_result() {
            Ok(Some(payload)) => payload,
            Ok(None) | Err(_) => {
                error!("{} succeeded without usable credentials", event);
                return Envelope::failure(ApiError::with_code(
                    format!("{} response carried no credentials", event),
                    CODE_MALFORMED,
                ));
            }
        };

        let store = self.api.store();
        let user = payload.user.as_ref().and_then(SessionUser::from_value);
        // one step under the store lock; a refresh still in flight for the previous session is discarded
        store
            .start_session(payload.access, &payload.refresh, user.as_ref())
            .await;

        // purge before anyone can read with the new identity
        self.api.bridge().on_login().await;
        store.set_state(SessionState::Authenticated);
        get_metrics().await.session_events.with_label_values(&[event]).inc();
        info!(
            "{} succeeded for account {}",
            event,
            user.and_then(|u| u.id()).unwrap_or_else(|| "<unknown>".to_owned())
        );

        if let Err(err) = self.refresh_profile().await {
            warn!("profile refresh after {} failed: {}", event, err);
        }
        envelope
    }

    /// Best-effort backend logout; local state is cleared whatever the backend says.
    pub async fn logout(&self) -> Envelope {
        let store = self.api.store();
        let envelope = match store.refresh_token() {
            Some(refresh) => {
                let body = json!(LogoutRequest { refresh });
                let options = RequestOptions::new().skip_auth_refresh();
                let envelope = self
                    .api
                    .request(Method::POST, AUTH_LOGOUT_PATH, Some(&body), options)
                    .await;
                if !envelope.success {
                    warn!("backend logout failed: {}", envelope.error_message().unwrap_or_default());
                }
                envelope
            }
            None => Envelope::empty(),
        };

        store.clear().await;
        self.api.bridge().on_logout().await;
        store.set_state(SessionState::Anonymous);
        get_metrics().await.session_events.with_label_values(&["logout"]).inc();
        info!("logged out");
        envelope
    }

    /// Start-up path: turn a stored refresh token back into a live session.
    /// Returns `Ok(false)` when there was nothing to restore.
    pub async fn refresh_from_storage(&self) -> Result<bool, AuthError> {
        let store = self.api.store();
        if store.refresh_token().is_none() {
            return Ok(false);
        }

        self.api.coordinator().refresh_now().await?;
        store.set_state(SessionState::Authenticated);
        get_metrics().await.session_events.with_label_values(&["restore"]).inc();

        if let Err(err) = self.refresh_profile().await {
            warn!("profile refresh after restore failed: {}", err);
        }
        Ok(true)
    }

    /// Fetch the profile, update the snapshot and drop the cached profile group.
    pub async fn refresh_profile(&self) -> Result<SessionUser, ApiError> {
        let envelope = self.api.get(AUTH_PROFILE_PATH, RequestOptions::new()).await;
        let user = Self::user_from(envelope)?;
        if let Err(err) = self.api.store().set_user(Some(&user)) {
            warn!("persisting user snapshot failed: {}", err);
        }
        self.api.bridge().after_write(GROUP_PROFILE).await;
        Ok(user)
    }

    /// Cached, account scoped profile read
    pub async fn profile(&self) -> Envelope {
        let key = self.api.account_key(GROUP_PROFILE);
        self.api
            .cached_get(key, AUTH_PROFILE_PATH, RequestOptions::new(), None)
            .await
    }

    pub async fn update_profile(&self, data: &Value) -> Envelope {
        let envelope = self
            .api
            .mutate(Method::PUT, AUTH_PROFILE_PATH, Some(data), GROUP_PROFILE)
            .await;
        if envelope.success {
            if let Ok(user) = Self::user_from(envelope.clone()) {
                if let Err(err) = self.api.store().set_user(Some(&user)) {
                    warn!("persisting user snapshot failed: {}", err);
                }
            }
        }
        envelope
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.api.store().user()
    }

    pub fn state(&self) -> SessionState {
        self.api.store().state()
    }

    fn user_from(envelope: Envelope) -> Result<SessionUser, ApiError> {
        match envelope.into_result()? {
            Some(data) => SessionUser::from_profile_data(&data)
                .ok_or_else(|| ApiError::with_code("Failed to fetch profile", CODE_MALFORMED)),
            None => Err(ApiError::with_code("Failed to fetch profile", CODE_MALFORMED)),
        }
    }
}
