// ABOUTME: In-memory cache implementation with lazy TTL expiry
// ABOUTME: Includes an optional background sweep for expired entries
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 WasteLink

use super::{CacheConfig, CacheProvider};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// In-memory cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at.checked_duration_since(Instant::now())
    }
}

type Store = Arc<RwLock<HashMap<String, CacheEntry>>>;

/// Aborts the sweep task once the last cache clone is dropped
struct CleanupTask(JoinHandle<()>);

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// In-memory cache keyed by caller-owned strings
///
/// There is no capacity bound; entries leave on read-after-expiry, explicit
/// invalidation, `clear_all`, or the optional background sweep.
#[derive(Clone)]
pub struct InMemoryCache {
    store: Store,
    cleanup: Option<Arc<CleanupTask>>,
}

impl InMemoryCache {
    fn new_with_config(config: &CacheConfig) -> Self {
        let store: Store = Arc::new(RwLock::new(HashMap::new()));

        let cleanup = if config.enable_background_cleanup {
            let store_clone = store.clone();
            let cleanup_interval = config.cleanup_interval;

            let handle = tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    interval.tick().await;
                    Self::cleanup_expired(&store_clone).await;
                }
            });

            Some(Arc::new(CleanupTask(handle)))
        } else {
            None
        };

        Self { store, cleanup }
    }

    /// Remove all expired entries from cache
    async fn cleanup_expired(store: &Store) {
        let mut store_guard = store.write().await;
        let before = store_guard.len();
        store_guard.retain(|_, entry| !entry.is_expired());
        let removed = before - store_guard.len();
        drop(store_guard);
        if removed > 0 {
            debug!("Cleaned up {} expired cache entries", removed);
        }
    }

    /// Whether the background sweep is running
    #[must_use]
    pub fn has_background_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }
}

#[async_trait]
impl CacheProvider for InMemoryCache {
    async fn new(config: CacheConfig) -> Self {
        Self::new_with_config(&config)
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_vec(value) {
            Ok(serialized) => {
                let entry = CacheEntry::new(serialized, ttl);
                self.store.write().await.insert(key.to_owned(), entry);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping cache write for unserializable value");
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut store = self.store.write().await;

        let entry = store.get(key)?;
        if entry.is_expired() {
            store.remove(key);
            return None;
        }

        let decoded = serde_json::from_slice::<T>(&entry.data);
        match decoded {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key = %key, error = %e, "Dropping cache entry of unexpected shape");
                store.remove(key);
                None
            }
        }
    }

    async fn invalidate(&self, key: &str) {
        self.store.write().await.remove(key);
    }

    async fn exists(&self, key: &str) -> bool {
        let mut store = self.store.write().await;
        let Some(expired) = store.get(key).map(CacheEntry::is_expired) else {
            return false;
        };
        if expired {
            store.remove(key);
        }
        !expired
    }

    async fn ttl(&self, key: &str) -> Option<Duration> {
        let store = self.store.read().await;
        store.get(key).and_then(CacheEntry::remaining_ttl)
    }

    async fn entry_count(&self) -> usize {
        self.store.read().await.len()
    }

    async fn clear_all(&self) {
        self.store.write().await.clear();
    }
}
