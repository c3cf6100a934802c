use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::helpers::time::{expires_in, now_i64};

/// Cache key: group first, then whatever narrows it (account id, params, record id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(group: &str) -> Self {
        Self(vec![group.to_owned()])
    }

    pub fn with(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn group(&self) -> &str {
        &self.0[0]
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub fetched_at: i64, // UNIX timestamp
    /// `None` never expires by time
    pub expires_at: Option<i64>,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |exp| now_i64() < exp)
    }
}

/// Shared key-value store of fetched results. Cloning shares the storage.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    inner: Arc<RwLock<HashMap<QueryKey, CacheEntry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: QueryKey, value: Value, ttl: Option<Duration>) {
        self.set_if(key, value, ttl, || true).await;
    }

    /// Store only if `is_current` still holds once the write lock is taken.
    /// Purges take the same lock, so a check that passes here cannot be
    /// followed by a purge that misses the entry. Expired entries are pruned.
    pub async fn set_if<F>(&self, key: QueryKey, value: Value, ttl: Option<Duration>, is_current: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut map = self.inner.write().await;
        if !is_current() {
            return false;
        }
        map.retain(|_, entry| entry.is_fresh());
        let entry = CacheEntry {
            value,
            fetched_at: now_i64(),
            expires_at: ttl.map(|ttl| expires_in(ttl.as_secs())),
        };
        debug!("cache set '{}'", key);
        map.insert(key, entry);
        true
    }

    /// Value if present and not expired; an expired entry is dropped
    pub async fn get(&self, key: &QueryKey) -> Option<Value> {
        {
            let map = self.inner.read().await;
            match map.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh() => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }
        let mut map = self.inner.write().await;
        if map.get(key).is_some_and(|entry| !entry.is_fresh()) {
            map.remove(key);
            debug!("cache expired '{}'", key);
        }
        None
    }

    pub async fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.inner.read().await.get(key).cloned()
    }

    /// Remove every entry of `group`, returns how many were dropped
    pub async fn invalidate(&self, group: &str) -> usize {
        self.remove_queries(&QueryKey::new(group)).await
    }

    /// Remove every entry whose key starts with `prefix`
    pub async fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|key, _| !key.starts_with(prefix));
        let removed = before - map.len();
        debug!("cache removed {} entries under '{}'", removed, prefix);
        removed
    }

    pub async fn group_len(&self, group: &str) -> usize {
        self.inner
            .read()
            .await
            .keys()
            .filter(|key| key.group() == group)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn invalidate_drops_whole_group_only() {
        let cache = QueryCache::new();
        cache.set(QueryKey::new("documents").with("1"), json!([1]), None).await;
        cache.set(QueryKey::new("documents").with("2"), json!([2]), None).await;
        cache.set(QueryKey::new("schemes"), json!(["s"]), None).await;

        assert_eq!(cache.invalidate("documents").await, 2);
        assert_eq!(cache.group_len("documents").await, 0);
        assert_eq!(cache.get(&QueryKey::new("schemes")).await, Some(json!(["s"])));
    }

    #[tokio::test]
    async fn remove_queries_matches_prefix() {
        let cache = QueryCache::new();
        cache.set(QueryKey::new("chatMessages").with("1").with("page-1"), json!([]), None).await;
        cache.set(QueryKey::new("chatMessages").with("2"), json!([]), None).await;
        // "chatMessages" must not match a group that merely shares a prefix
        cache.set(QueryKey::new("chatMessagesArchive"), json!([]), None).await;

        let removed = cache.remove_queries(&QueryKey::new("chatMessages").with("1")).await;
        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.invalidate("chatMessages").await, 1);
        assert_eq!(cache.group_len("chatMessagesArchive").await, 1);
    }

    #[tokio::test]
    async fn ttl_entries_expire() {
        let cache = QueryCache::new();
        let key = QueryKey::new("regions");
        cache.set(key.clone(), json!(["north"]), Some(Duration::from_secs(2))).await;
        assert!(cache.get(&key).await.is_some());

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.entry(&key).await.is_none());
    }

    #[tokio::test]
    async fn set_prunes_expired_entries() {
        let cache = QueryCache::new();
        for page in ["1", "2", "3"] {
            let key = QueryKey::new("schemes").with(page);
            cache.set(key, json!([page]), Some(Duration::from_secs(1))).await;
        }
        tokio::time::sleep(Duration::from_millis(2100)).await;

        cache.set(QueryKey::new("regions"), json!([]), None).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.group_len("schemes").await, 0);
    }

    #[tokio::test]
    async fn set_if_respects_predicate() {
        let cache = QueryCache::new();
        let key = QueryKey::new("documents").with("1");
        assert!(!cache.set_if(key.clone(), json!(["a"]), None, || false).await);
        assert_eq!(cache.get(&key).await, None);
        assert!(cache.set_if(key.clone(), json!(["a"]), None, || true).await);
        assert_eq!(cache.get(&key).await, Some(json!(["a"])));
    }

    #[test]
    fn key_display() {
        let key = QueryKey::new("documents").with("42");
        assert_eq!(key.to_string(), "documents:42");
        assert_eq!(key.group(), "documents");
        assert_eq!(key.parts().len(), 2);
    }
}
