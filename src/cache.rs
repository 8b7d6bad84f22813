//! Query-embedding cache for the serving path.
//!
//! Callers often repeat the same short utterances ("what are your hours"),
//! so the turn handler memoizes `(tenant, text) -> vector`. Entries expire
//! `ttl` after insertion; capacity is bounded by LRU eviction. A capacity
//! of zero disables caching.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

use receptionist_kb_core::TenantId;

use crate::config::CacheConfig;

type Key = (TenantId, String);

pub struct QueryCache {
    inner: Option<Mutex<LruCache<Key, (Instant, Vec<f32>)>>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn get(&self, tenant: &TenantId, text: &str) -> Option<Vec<f32>> {
        let inner = self.inner.as_ref()?;
        let key = (tenant.clone(), text.to_string());
        let mut cache = inner.lock().await;
        match cache.get(&key) {
            Some((at, vector)) if at.elapsed() < self.ttl => Some(vector.clone()),
            Some(_) => {
                cache.pop(&key);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, tenant: &TenantId, text: &str, vector: Vec<f32>) {
        if let Some(inner) = &self.inner {
            inner
                .lock()
                .await
                .put((tenant.clone(), text.to_string()), (Instant::now(), vector));
        }
    }

    pub async fn len(&self) -> usize {
        match &self.inner {
            Some(inner) => inner.lock().await.len(),
            None => 0,
        }
    }
}
