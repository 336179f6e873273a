// ABOUTME: Maps external identities onto persisted profiles with cached, time-bounded reads
// ABOUTME: Idempotent first-sign-in insert, fallback profiles on slow stores, and write-through updates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use wastelink_core::constants::{cache as cache_consts, identity as identity_consts};
use wastelink_core::errors::{AppError, AppResult};
use wastelink_core::models::{PendingIntent, ProfileUpdate, UserProfile, UserType};

use super::fallback::{display_name, fallback_profile};
use super::{resolve_user_type, ExternalIdentity, IdentityProvider, SignInRedirect, SignInState};
use crate::cache::{Cache, CacheProvider};
use crate::config::ResolverConfig;
use crate::database_plugins::{DatabaseProvider, InsertOutcome};

/// A completed sign-in
#[derive(Debug, Clone)]
pub struct SignedIn {
    /// Identity returned by the provider
    pub identity: ExternalIdentity,
    /// Resolved local profile (possibly a fallback)
    pub profile: UserProfile,
}

fn exists_key(id: &str) -> String {
    format!("{}:{id}", cache_consts::PROFILE_EXISTS_PREFIX)
}

fn profile_key(id: &str) -> String {
    format!("{}:{id}", cache_consts::PROFILE_PREFIX)
}

/// Resolves external identities to local profiles
///
/// Owns the `profile_exists:*` and `profile:*` cache namespaces and is the
/// only component that invalidates them.
pub struct IdentityResolver {
    database: Arc<dyn DatabaseProvider>,
    provider: Arc<dyn IdentityProvider>,
    cache: Cache,
    config: ResolverConfig,
}

impl IdentityResolver {
    /// Create a resolver over the given store, provider, and cache
    #[must_use]
    pub fn new(
        database: Arc<dyn DatabaseProvider>,
        provider: Arc<dyn IdentityProvider>,
        cache: Cache,
        config: ResolverConfig,
    ) -> Self {
        Self {
            database,
            provider,
            cache,
            config,
        }
    }

    /// Start an external sign-in, remembering the chosen role across the redirect
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not configured or the pending
    /// intent cannot be stored
    pub async fn begin_sign_in(&self, hint: Option<UserType>) -> AppResult<SignInRedirect> {
        let state = SignInState::new(hint);
        let redirect = self.provider.begin_sign_in(&state)?;

        if let Some(user_type) = hint {
            self.database
                .store_pending_intent(&state.nonce, PendingIntent { user_type }, Utc::now())
                .await?;
        }

        debug!(provider = self.provider.name(), ?hint, "Sign-in started");
        Ok(redirect)
    }

    /// Finish an external sign-in and resolve the caller's profile
    ///
    /// The pending intent for this redirect is consumed exactly once here. It
    /// is looked up by `intent_key` when the caller still holds it, otherwise
    /// by the nonce inside `raw_state`, so losing either channel is survivable.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the code or the first-sign-in
    /// insert fails. Profile reads never fail; they degrade to a fallback.
    pub async fn complete_sign_in(
        &self,
        code: &str,
        raw_state: Option<&str>,
        intent_key: Option<&str>,
    ) -> AppResult<SignedIn> {
        let identity = self.provider.complete_sign_in(code).await?;
        let pending = self.take_pending_intent(raw_state, intent_key).await;

        self.ensure_profile_exists(&identity, pending.as_ref(), raw_state)
            .await?;
        let profile = self.fetch_profile(&identity).await;

        info!(user_id = %identity.id, user_type = %profile.user_type, "User signed in");
        Ok(SignedIn { identity, profile })
    }

    async fn take_pending_intent(
        &self,
        raw_state: Option<&str>,
        intent_key: Option<&str>,
    ) -> Option<PendingIntent> {
        let key = intent_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .or_else(|| raw_state.and_then(SignInState::decode).map(|s| s.nonce))?;
        let not_before =
            Utc::now() - chrono::Duration::seconds(identity_consts::PENDING_INTENT_TTL_SECS);

        match self.database.take_pending_intent(&key, not_before).await
        {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "Pending intent lookup failed; continuing without it");
                None
            }
        }
    }

    /// Make sure a profile row exists for this identity
    ///
    /// A missing row is the ordinary first-sign-in case and triggers an insert.
    /// Losing an insert race to a concurrent sign-in is not an error.
    ///
    /// # Errors
    ///
    /// Returns any store error other than "not found"
    pub async fn ensure_profile_exists(
        &self,
        identity: &ExternalIdentity,
        pending: Option<&PendingIntent>,
        raw_state: Option<&str>,
    ) -> AppResult<()> {
        let key = exists_key(&identity.id);
        if self.cache.exists(&key).await {
            return Ok(());
        }

        if self.database.get_profile(&identity.id).await?.is_none() {
            let user_type = resolve_user_type(Some(&identity.metadata), pending, raw_state);
            let now = Utc::now();
            let profile = UserProfile {
                id: identity.id.clone(),
                email: identity.email.clone(),
                full_name: display_name(identity),
                user_type,
                phone: None,
                address: None,
                email_verified: identity.email_verified,
                phone_verified: false,
                created_at: now,
                updated_at: now,
            };

            match self.database.insert_profile(&profile).await? {
                InsertOutcome::Inserted => {
                    info!(user_id = %identity.id, %user_type, "Created profile on first sign-in");
                }
                InsertOutcome::AlreadyExists => {
                    debug!(user_id = %identity.id, "Profile created concurrently; keeping existing row");
                }
            }
        }

        self.cache
            .set(
                &key,
                &true,
                Duration::from_secs(cache_consts::TTL_PROFILE_EXISTS_SECS),
            )
            .await;
        Ok(())
    }

    /// Read the caller's profile, never blocking longer than the fetch budget
    ///
    /// On timeout, store error, or a missing row, a profile synthesized from
    /// the identity is returned and cached briefly so a later read retries.
    pub async fn fetch_profile(&self, identity: &ExternalIdentity) -> UserProfile {
        let key = profile_key(&identity.id);
        if let Some(profile) = self.cache.get::<UserProfile>(&key).await {
            return profile;
        }

        let fetched = tokio::time::timeout(
            self.config.profile_fetch_timeout,
            self.database.get_profile(&identity.id),
        )
        .await;

        match fetched {
            Ok(Ok(Some(profile))) => {
                self.cache
                    .set(
                        &key,
                        &profile,
                        Duration::from_secs(cache_consts::TTL_PROFILE_SECS),
                    )
                    .await;
                return profile;
            }
            Ok(Ok(None)) => {
                debug!(user_id = %identity.id, "Profile row missing; using fallback");
            }
            Ok(Err(e)) => {
                warn!(user_id = %identity.id, error = %e, "Profile fetch failed; using fallback");
            }
            Err(_) => {
                warn!(
                    user_id = %identity.id,
                    timeout_ms = self.config.profile_fetch_timeout.as_millis(),
                    "Profile fetch timed out; using fallback"
                );
            }
        }

        let profile = fallback_profile(identity, Utc::now());
        self.cache
            .set(
                &key,
                &profile,
                Duration::from_secs(cache_consts::TTL_FALLBACK_PROFILE_SECS),
            )
            .await;
        profile
    }

    /// Apply a partial update, writing through to the store
    ///
    /// Both cache entries for the user are dropped before the write; the
    /// merged profile is cached again afterwards.
    ///
    /// # Errors
    ///
    /// Returns invalid input for a blank name, or any store error. Write
    /// failures are always surfaced.
    pub async fn update_profile(
        &self,
        identity: &ExternalIdentity,
        update: &ProfileUpdate,
    ) -> AppResult<UserProfile> {
        if update
            .full_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(AppError::invalid_input("Full name cannot be blank"));
        }

        self.invalidate(&identity.id).await;

        let now = Utc::now();
        let profile = if let Some(mut existing) = self.database.get_profile(&identity.id).await? {
            update.apply_to(&mut existing, now);
            if self.database.update_profile(&existing).await?.is_none() {
                self.database.insert_profile(&existing).await?;
            }
            existing
        } else {
            let mut created = fallback_profile(identity, now);
            update.apply_to(&mut created, now);
            if self.database.insert_profile(&created).await? == InsertOutcome::AlreadyExists {
                self.database.update_profile(&created).await?;
            }
            created
        };

        self.cache
            .set(
                &profile_key(&identity.id),
                &profile,
                Duration::from_secs(cache_consts::TTL_PROFILE_SECS),
            )
            .await;
        self.cache
            .set(
                &exists_key(&identity.id),
                &true,
                Duration::from_secs(cache_consts::TTL_PROFILE_EXISTS_SECS),
            )
            .await;

        debug!(user_id = %identity.id, "Profile updated");
        Ok(profile)
    }

    /// Drop the cached profile entries for a user; the stored row is untouched
    pub async fn sign_out(&self, user_id: &str) {
        self.invalidate(user_id).await;
        info!(user_id = %user_id, "User signed out");
    }

    async fn invalidate(&self, user_id: &str) {
        self.cache.invalidate(&exists_key(user_id)).await;
        self.cache.invalidate(&profile_key(user_id)).await;
    }
}
