// ABOUTME: External identity abstraction and local profile resolution
// ABOUTME: Provider trait, callback identity types, user-type precedence, and the cached resolver
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

//! # Identity
//!
//! An external provider authenticates the caller; this module turns the
//! provider's callback into a persisted [`UserProfile`](wastelink_core::models::UserProfile).
//!
//! - [`IdentityProvider`] is the opaque "redirect out, exchange code back" capability
//! - [`resolve_user_type`] reconstructs the role chosen before the redirect
//! - [`IdentityResolver`] ensures the profile row exists and serves cached reads,
//!   degrading to a synthesized profile when the store is slow

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wastelink_core::errors::AppResult;
use wastelink_core::models::UserType;

/// Synthesized profiles and display-name derivation
pub mod fallback;
/// `OAuth2` authorization-code provider
pub mod oauth2;
/// Profile existence, cached reads, and updates
pub mod resolver;
/// Sign-in state parameter and user-type precedence
pub mod user_type;

pub use oauth2::OAuth2IdentityProvider;
pub use resolver::IdentityResolver;
pub use user_type::{resolve_user_type, SignInState};

/// Where to send the caller to start an external sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInRedirect {
    /// Provider authorization URL
    pub url: String,
    /// Opaque state parameter embedded in `url`
    pub state: String,
    /// Pending-intent key, returned to the browser outside the provider round-trip
    pub intent_key: String,
}

/// Metadata the provider attaches to its session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Full display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Name as reported by the provider
    #[serde(default)]
    pub name: Option<String>,
    /// Given name
    #[serde(default)]
    pub given_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub family_name: Option<String>,
    /// Role stored with the provider's own user record
    #[serde(default)]
    pub user_type: Option<UserType>,
}

/// Identity established by a completed external sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider subject; also the local profile key
    pub id: String,
    /// Email address
    pub email: String,
    /// Whether the provider verified the email
    #[serde(default)]
    pub email_verified: bool,
    /// Provider session metadata
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// External identity capability
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Build the redirect that starts a sign-in carrying `state`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider is not set up
    fn authorization_url(&self, state: &str) -> AppResult<String>;

    /// Exchange the callback code for the caller's identity
    ///
    /// # Errors
    ///
    /// Returns an external service error if the exchange or profile lookup fails
    async fn complete_sign_in(&self, code: &str) -> AppResult<ExternalIdentity>;

    /// Build the redirect for a prepared sign-in state
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider is not set up
    fn begin_sign_in(&self, state: &SignInState) -> AppResult<SignInRedirect> {
        let encoded = state.encode()?;
        let url = self.authorization_url(&encoded)?;
        Ok(SignInRedirect {
            url,
            state: encoded,
            intent_key: state.nonce.clone(),
        })
    }
}
