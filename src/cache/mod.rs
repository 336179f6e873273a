// ABOUTME: Process-local TTL cache abstraction used to avoid redundant remote calls
// ABOUTME: Callers own their key namespaces and invalidation; the cache knows nothing about them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// In-memory cache implementation
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use wastelink_core::constants::cache::DEFAULT_CLEANUP_INTERVAL_SECS;

/// The cache backend used by the server
pub type Cache = memory::InMemoryCache;

/// Cache provider trait for pluggable backend implementations
///
/// A cache is never a source of truth. Every operation is best-effort and
/// infallible from the caller's point of view: a value that cannot be stored
/// or decoded simply behaves as a miss, which the owning component resolves
/// by recomputing.
///
/// # Examples
///
/// ```rust,no_run
/// use wastelink_server::cache::{Cache, CacheConfig, CacheProvider};
/// use std::time::Duration;
/// # async fn example() {
/// let cache = Cache::new(CacheConfig {
///     enable_background_cleanup: false,
///     ..Default::default()
/// })
/// .await;
///
/// cache.set("profile:abc", &"Ada", Duration::from_secs(300)).await;
/// let name: Option<String> = cache.get("profile:abc").await;
/// assert_eq!(name.as_deref(), Some("Ada"));
///
/// cache.invalidate("profile:abc").await;
/// # }
/// ```
#[async_trait]
pub trait CacheProvider: Send + Sync + Clone {
    /// Create new cache instance with configuration
    async fn new(config: CacheConfig) -> Self
    where
        Self: Sized;

    /// Store value with an absolute expiry of now + `ttl`, replacing any prior entry
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration);

    /// Retrieve value; an expired entry behaves as a miss and is dropped
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T>;

    /// Remove single cache entry
    async fn invalidate(&self, key: &str);

    /// Check if a live entry exists for key
    async fn exists(&self, key: &str) -> bool;

    /// Get remaining TTL for key
    async fn ttl(&self, key: &str) -> Option<Duration>;

    /// Number of stored entries, including expired ones not yet dropped
    async fn entry_count(&self) -> usize;

    /// Clear all cache entries
    async fn clear_all(&self);
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cleanup interval for expired entries
    pub cleanup_interval: Duration,
    /// Enable background cleanup task (should be false in tests to avoid runtime conflicts)
    pub enable_background_cleanup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
        }
    }
}
