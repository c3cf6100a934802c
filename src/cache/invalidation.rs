use tracing::info;

use crate::cache::query_cache::QueryCache;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::ACCOUNT_SCOPED_GROUPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    Login,
    Logout,
    SessionExpired,
    Write,
}

impl InvalidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationReason::Login => "login",
            InvalidationReason::Logout => "logout",
            InvalidationReason::SessionExpired => "session_expired",
            InvalidationReason::Write => "write",
        }
    }
}

/// Keeps cached reads consistent with the identity currently holding the session.
///
/// Every method completes the purge before returning, so a caller that awaits
/// it before handing control back cannot observe the previous account's data.
#[derive(Debug, Clone)]
pub struct InvalidationBridge {
    cache: QueryCache,
}

impl InvalidationBridge {
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn on_login(&self) {
        self.purge_account_groups(InvalidationReason::Login).await;
    }

    pub async fn on_logout(&self) {
        self.purge_account_groups(InvalidationReason::Logout).await;
    }

    pub async fn on_session_expired(&self) {
        self.purge_account_groups(InvalidationReason::SessionExpired).await;
    }

    /// "mutate, then invalidate the group"
    pub async fn after_write(&self, group: &str) {
        self.invalidate(group, InvalidationReason::Write).await;
    }

    async fn purge_account_groups(&self, reason: InvalidationReason) {
        let mut removed = 0;
        for group in ACCOUNT_SCOPED_GROUPS {
            removed += self.invalidate(group, reason).await;
        }
        info!("purged {} account scoped cache entries after {}", removed, reason.as_str());
    }

    async fn invalidate(&self, group: &str, reason: InvalidationReason) -> usize {
        let removed = self.cache.invalidate(group).await;
        get_metrics()
            .await
            .cache_invalidations
            .with_label_values(&[group, reason.as_str()])
            .inc();
        removed
    }
}
