// ABOUTME: Session token issuance and validation for signed-in users
// ABOUTME: HS256 JWTs carrying the profile id, email, and role, plus bearer header authentication
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

//! # Sessions
//!
//! After the identity provider callback completes, the server issues its own
//! short-lived session token. Every `/api` route authenticates with it.

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wastelink_core::constants::service_names;
use wastelink_core::errors::{AppError, AppResult};
use wastelink_core::models::{UserProfile, UserType};

use crate::config::SessionConfig;
use crate::identity::{ExternalIdentity, SessionMetadata};

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Profile id (identity provider subject)
    pub sub: String,
    /// User email
    pub email: String,
    /// Whether the provider verified the email
    #[serde(default)]
    pub email_verified: bool,
    /// Display name at sign-in, used if a fallback profile has to be built
    #[serde(default)]
    pub name: Option<String>,
    /// Role when the token was issued
    pub user_type: UserType,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Audience (who the token is intended for)
    pub aud: String,
}

/// Caller authenticated by a session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Profile id
    pub user_id: String,
    /// Email
    pub email: String,
    /// Whether the provider verified the email
    pub email_verified: bool,
    /// Display name at sign-in
    pub name: Option<String>,
    /// Role when the token was issued; a role change re-issues the token
    pub user_type: UserType,
}

impl AuthenticatedUser {
    /// Identity view used for profile reads and fallbacks
    #[must_use]
    pub fn identity(&self) -> ExternalIdentity {
        ExternalIdentity {
            id: self.user_id.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            metadata: SessionMetadata {
                full_name: self.name.clone(),
                user_type: Some(self.user_type),
                ..SessionMetadata::default()
            },
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            name: claims.name,
            user_type: claims.user_type,
        }
    }
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl SessionManager {
    /// Create a manager from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the secret is empty
    pub fn new(config: &SessionConfig) -> AppResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AppError::config("Session secret is empty"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiry: Duration::hours(config.expiry_hours),
        })
    }

    /// Issue a token for a resolved profile
    ///
    /// # Errors
    ///
    /// Returns an internal error if signing fails
    pub fn issue(&self, profile: &UserProfile) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: profile.id.clone(),
            email: profile.email.clone(),
            email_verified: profile.email_verified,
            name: Some(profile.full_name.clone()),
            user_type: profile.user_type,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
            aud: service_names::SESSION_AUDIENCE.to_owned(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign session token: {e}")))
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// Returns `AUTH_INVALID` for a malformed, expired, or foreign token
    pub fn validate(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[service_names::SESSION_AUDIENCE]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected session token");
                AppError::auth_invalid(format!("Invalid session token: {e}"))
            })
    }

    /// Authenticate a request from its `Authorization: Bearer` header
    ///
    /// # Errors
    ///
    /// Returns `AUTH_REQUIRED` when the header is missing and `AUTH_INVALID`
    /// when it is malformed or the token does not validate
    pub fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthenticatedUser> {
        let header = headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(AppError::auth_required)?
            .to_str()
            .map_err(|_| AppError::auth_invalid("Authorization header is not valid UTF-8"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::auth_invalid("Expected a Bearer token"))?;

        self.validate(token).map(AuthenticatedUser::from)
    }
}
