// ABOUTME: Sign-in state parameter encoding and user-type precedence rules
// ABOUTME: Reconstructs the chosen role from provider metadata, pending intent, or redirect state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wastelink_core::errors::AppResult;
use wastelink_core::models::{PendingIntent, UserType};

use super::SessionMetadata;

/// Payload of the opaque `state` parameter sent through the provider redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInState {
    /// Random nonce; also the pending-intent key
    pub nonce: String,
    /// Role chosen before the redirect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
}

impl SignInState {
    /// Fresh state with a random nonce
    #[must_use]
    pub fn new(user_type: Option<UserType>) -> Self {
        Self {
            nonce: Uuid::new_v4().simple().to_string(),
            user_type,
        }
    }

    /// Encode as base64url JSON
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the payload cannot be encoded
    pub fn encode(&self) -> AppResult<String> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    /// Decode a state parameter; anything malformed yields `None`
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(raw.trim().trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Decide the role for a first sign-in
///
/// First match wins:
/// 1. the role in the provider's own session metadata
/// 2. the locally stored pending intent
/// 3. the role decoded from the redirect `state` parameter
///
/// With no usable hint the caller is a dumper.
#[must_use]
pub fn resolve_user_type(
    metadata: Option<&SessionMetadata>,
    pending: Option<&PendingIntent>,
    raw_state: Option<&str>,
) -> UserType {
    metadata
        .and_then(|m| m.user_type)
        .or_else(|| pending.map(|p| p.user_type))
        .or_else(|| raw_state.and_then(SignInState::decode).and_then(|s| s.user_type))
        .unwrap_or_default()
}
