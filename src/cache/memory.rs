//! In-process cache store with TTL.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheResult, CacheStore};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// A thread-safe map of key -> (payload, expiry).
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Drop expired entries.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.inner.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if let Some(entry) = self.inner.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            drop(entry);
            self.inner.remove(key);
        }
        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        self.inner.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn ping(&self) -> CacheResult<bool> {
        Ok(true)
    }
}
