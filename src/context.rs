// ABOUTME: Shared server resources wired once at startup and handed to every route
// ABOUTME: Owns the store, cache, resolver, verification gate, trackers, lifecycle, and sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::cache::Cache;
use crate::config::ServerConfig;
use crate::database_plugins::DatabaseProvider;
use crate::geolocation::TrackerRegistry;
use crate::identity::{IdentityProvider, IdentityResolver};
use crate::lifecycle::RequestLifecycle;
use crate::verification::{MessagingProvider, VerificationGate};

/// Dependencies shared by all HTTP handlers
///
/// Components receive only the pieces they need at construction; handlers
/// reach them through this struct.
pub struct ServerResources {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Persistent store
    pub database: Arc<dyn DatabaseProvider>,
    /// Process-local cache
    pub cache: Cache,
    /// Session token issuer and validator
    pub sessions: SessionManager,
    /// Identity to profile resolution
    pub resolver: Arc<IdentityResolver>,
    /// Phone verification gate
    pub verification: VerificationGate,
    /// Per-user position trackers
    pub trackers: TrackerRegistry,
    /// Request operations
    pub requests: RequestLifecycle,
}

impl ServerResources {
    /// Wire every component from its collaborators
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        database: Arc<dyn DatabaseProvider>,
        cache: Cache,
        identity_provider: Arc<dyn IdentityProvider>,
        messaging: Arc<dyn MessagingProvider>,
        sessions: SessionManager,
    ) -> Self {
        let resolver = Arc::new(IdentityResolver::new(
            Arc::clone(&database),
            identity_provider,
            cache.clone(),
            config.resolver,
        ));
        let verification = VerificationGate::new(messaging, Arc::clone(&resolver));
        let trackers = TrackerRegistry::new(Arc::clone(&database));
        let requests = RequestLifecycle::new(Arc::clone(&database), config.matching.radius_km);

        Self {
            config,
            database,
            cache,
            sessions,
            resolver,
            verification,
            trackers,
            requests,
        }
    }

    /// Drop every piece of per-user session state
    pub async fn sign_out(&self, user_id: &str) {
        self.resolver.sign_out(user_id).await;
        self.verification.reset(user_id);
        self.trackers.remove(user_id);
    }
}
