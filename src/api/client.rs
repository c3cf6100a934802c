use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use http::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::refresh::RefreshCoordinator;
use crate::cache::invalidation::InvalidationBridge;
use crate::cache::query_cache::{QueryCache, QueryKey};
use crate::config::settings::{ClientConfig, StorageKind};
use crate::observability::metrics::get_metrics;
use crate::session::storage::{DurableStorage, FileStorage, MemoryStorage};
use crate::session::token_store::TokenStore;
use crate::transport::client::{RequestOptions, Transport};
use crate::transport::envelope::Envelope;
use crate::utils::constants::{ACCOUNT_SCOPED_GROUPS, ANONYMOUS_ACCOUNT};

static HIT_MSG: &str = "hit";
static MISS_MSG: &str = "miss";

/// Authenticated access to the backend.
///
/// Cheap to clone; all clones share the token store, the refresh guard and the cache.
#[derive(Debug, Clone)]
pub struct ApiClient {
    transport: Arc<Transport>,
    store: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    bridge: InvalidationBridge,
    default_ttl: Option<Duration>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: Arc<TokenStore>, cache: QueryCache) -> Result<Self> {
        let transport = Arc::new(Transport::new(&config.api)?);
        let bridge = InvalidationBridge::new(cache);
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            store.clone(),
            bridge.clone(),
        ));
        Ok(Self {
            transport,
            store,
            coordinator,
            bridge,
            default_ttl: config.cache.default_ttl(),
        })
    }

    /// Build storage, token store and cache as described by the config
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let durable: Arc<dyn DurableStorage> = match config.storage.kind {
            StorageKind::File => {
                let path = config.storage.path_or_default();
                info!("durable storage at '{}'", path);
                Arc::new(FileStorage::new(path))
            }
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        };
        Self::new(config, Arc::new(TokenStore::new(durable)), QueryCache::new())
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn cache(&self) -> &QueryCache {
        self.bridge.cache()
    }

    pub fn bridge(&self) -> &InvalidationBridge {
        &self.bridge
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Send with the current access token; on 401 refresh once and retry once.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Envelope {
        let epoch = self.store.session_epoch();
        let (token, generation) = self.store.access_snapshot().await;
        let first = self
            .transport
            .send(method.clone(), path, body, &options, token.as_deref())
            .await;

        if !first.is_unauthorized() || options.skip_auth_refresh {
            return first.envelope;
        }

        debug!("{} {} unauthorized, recovering", method, path);
        let fresh = match self.coordinator.recover(generation, epoch).await {
            Ok(fresh) => fresh,
            Err(err) => return err.into(),
        };

        let metrics = get_metrics().await;
        let retried = self
            .transport
            .send(method.clone(), path, body, &options, Some(&fresh))
            .await;
        if retried.is_unauthorized() {
            // retry depth is one
            warn!("{} {} rejected again after refresh", method, path);
            metrics.refresh_retries.with_label_values(&["unauthorized"]).inc();
        } else {
            metrics.refresh_retries.with_label_values(&["completed"]).inc();
        }
        retried.envelope
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Envelope {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Envelope {
        self.request(Method::POST, path, Some(body), RequestOptions::new()).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Envelope {
        self.request(Method::PUT, path, Some(body), RequestOptions::new()).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Envelope {
        self.request(Method::PATCH, path, Some(body), RequestOptions::new()).await
    }

    pub async fn delete(&self, path: &str) -> Envelope {
        self.request(Method::DELETE, path, None, RequestOptions::new()).await
    }

    /// Key of `group` scoped to the account holding the session
    pub fn account_key(&self, group: &str) -> QueryKey {
        let account = self
            .store
            .account_id()
            .unwrap_or_else(|| ANONYMOUS_ACCOUNT.to_owned());
        QueryKey::new(group).with(account)
    }

    /// GET served from the cache when possible; successful data is cached under `key`.
    ///
    /// Data is only stored when the session that issued the read still holds
    /// the session afterwards, so a read racing a logout or account switch
    /// never lands in the next account's cache.
    pub async fn cached_get(
        &self,
        key: QueryKey,
        path: &str,
        options: RequestOptions,
        ttl: Option<Duration>,
    ) -> Envelope {
        let epoch = self.store.session_epoch();
        if !self.key_matches_session(&key) {
            debug!("'{}' belongs to another account, bypassing cache", key);
            return self.get(path, options).await;
        }

        let metrics = get_metrics().await;
        if let Some(value) = self.cache().get(&key).await {
            metrics.cache_lookups.with_label_values(&[key.group(), HIT_MSG]).inc();
            debug!("cache hit '{}'", key);
            return Envelope::ok(value);
        }
        metrics.cache_lookups.with_label_values(&[key.group(), MISS_MSG]).inc();

        let envelope = self.get(path, options).await;
        if envelope.success {
            if let Some(data) = &envelope.data {
                let store = self.store.clone();
                let stored = self
                    .cache()
                    .set_if(key.clone(), data.clone(), ttl, move || store.session_epoch() == epoch)
                    .await;
                if !stored {
                    debug!("session changed during read, not caching '{}'", key);
                }
            }
        }
        envelope
    }

    /// Account scoped keys carry the account id right after the group
    fn key_matches_session(&self, key: &QueryKey) -> bool {
        if !ACCOUNT_SCOPED_GROUPS.contains(&key.group()) {
            return true;
        }
        let account = self
            .store
            .account_id()
            .unwrap_or_else(|| ANONYMOUS_ACCOUNT.to_owned());
        key.parts().get(1) == Some(&account)
    }

    /// Write, then invalidate `group` when the backend accepted it
    pub async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        group: &str,
    ) -> Envelope {
        let envelope = self.request(method, path, body, RequestOptions::new()).await;
        if envelope.success {
            self.bridge.after_write(group).await;
        }
        envelope
    }
}
