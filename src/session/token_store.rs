use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::session::storage::DurableStorage;
use crate::session::user::SessionUser;
use crate::session::SessionState;
use crate::utils::constants::{REFRESH_TOKEN_KEY, USER_KEY};

#[derive(Default)]
struct AccessSlot {
    token: Option<String>,
    /// bumped on every change of `token`
    generation: u64,
}

impl std::fmt::Debug for AccessSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessSlot")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("generation", &self.generation)
            .finish()
    }
}

/// Single source of truth for the credential pair.
///
/// The access token only ever lives in `access`; the refresh token and the
/// user snapshot live in durable storage. Writes that must not interleave
/// (session start, clear, installing refreshed tokens) all happen under the
/// `access` write lock.
#[derive(Debug)]
pub struct TokenStore {
    access: RwLock<AccessSlot>,
    /// bumped whenever the identity holding the session changes (login, clear)
    session_epoch: AtomicU64,
    durable: Arc<dyn DurableStorage>,
    state: watch::Sender<SessionState>,
}

impl TokenStore {
    pub fn new(durable: Arc<dyn DurableStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            access: RwLock::new(AccessSlot::default()),
            session_epoch: AtomicU64::new(0),
            durable,
            state,
        }
    }

    /// Replace the in-memory access token, `None` clears it
    pub async fn set_access_token(&self, token: Option<String>) {
        let mut slot = self.access.write().await;
        Self::replace_access(&mut slot, token);
    }

    fn replace_access(slot: &mut AccessSlot, token: Option<String>) {
        slot.token = token;
        slot.generation += 1;
        debug!("access token replaced, generation {}", slot.generation);
    }

    pub async fn access_token(&self) -> Option<String> {
        self.access.read().await.token.clone()
    }

    /// Current token together with the generation it belongs to
    pub async fn access_snapshot(&self) -> (Option<String>, u64) {
        let slot = self.access.read().await;
        (slot.token.clone(), slot.generation)
    }

    pub fn session_epoch(&self) -> u64 {
        self.session_epoch.load(Ordering::SeqCst)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.durable
            .get(REFRESH_TOKEN_KEY)
            .inspect_err(|err| warn!("reading refresh token failed: {}", err))
            .ok()
            .flatten()
            .filter(|token| !token.is_empty())
    }

    pub fn set_refresh_token(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => self.durable.set(REFRESH_TOKEN_KEY, token),
            None => self.durable.remove(REFRESH_TOKEN_KEY),
        }
    }

    /// Stored user snapshot. An unreadable snapshot is dropped.
    pub fn user(&self) -> Option<SessionUser> {
        let raw = self
            .durable
            .get(USER_KEY)
            .inspect_err(|err| warn!("reading user snapshot failed: {}", err))
            .ok()
            .flatten()?;
        match serde_json::from_str::<SessionUser>(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!("dropping unreadable user snapshot: {}", err);
                let _ = self.durable.remove(USER_KEY);
                None
            }
        }
    }

    pub fn set_user(&self, user: Option<&SessionUser>) -> Result<()> {
        match user {
            Some(user) => self.durable.set(USER_KEY, &serde_json::to_string(user)?),
            None => self.durable.remove(USER_KEY),
        }
    }

    pub fn account_id(&self) -> Option<String> {
        self.user().and_then(|user| user.id())
    }

    /// Install the credentials of a freshly authenticated identity.
    pub async fn start_session(&self, access: String, refresh: &str, user: Option<&SessionUser>) {
        let mut slot = self.access.write().await;
        self.session_epoch.fetch_add(1, Ordering::SeqCst);
        Self::replace_access(&mut slot, Some(access));
        if let Err(err) = self.set_refresh_token(Some(refresh)) {
            warn!("persisting refresh token failed: {}", err);
        }
        if let Err(err) = self.set_user(user) {
            warn!("persisting user snapshot failed: {}", err);
        }
    }

    /// Install the result of a refresh exchange started at `expected` generation.
    /// Returns false, leaving the store untouched, when the session moved on meanwhile.
    pub async fn install_refreshed(&self, expected: u64, access: String, refresh: Option<&str>) -> bool {
        let mut slot = self.access.write().await;
        if slot.generation != expected {
            return false;
        }
        Self::replace_access(&mut slot, Some(access));
        if let Some(refresh) = refresh {
            if let Err(err) = self.set_refresh_token(Some(refresh)) {
                warn!("persisting rotated refresh token failed: {}", err);
            }
        }
        true
    }

    /// Drop access token, refresh token and user snapshot
    pub async fn clear(&self) {
        let mut slot = self.access.write().await;
        self.clear_locked(&mut slot);
    }

    /// Clear only if nothing replaced the access token since `expected`
    pub async fn clear_if(&self, expected: u64) -> bool {
        let mut slot = self.access.write().await;
        if slot.generation != expected {
            return false;
        }
        self.clear_locked(&mut slot);
        true
    }

    fn clear_locked(&self, slot: &mut AccessSlot) {
        self.session_epoch.fetch_add(1, Ordering::SeqCst);
        Self::replace_access(slot, None);
        if let Err(err) = self.set_refresh_token(None) {
            warn!("removing refresh token failed: {}", err);
        }
        if let Err(err) = self.set_user(None) {
            warn!("removing user snapshot failed: {}", err);
        }
        info!("credentials cleared");
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            info!("session state {:?} -> {:?}", previous, state);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
