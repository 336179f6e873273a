// ABOUTME: Sign-in, provider callback, and sign-out route handlers
// ABOUTME: Redirects to the identity provider and issues session tokens on return
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use wastelink_core::errors::AppError;
use wastelink_core::models::{UserProfile, UserType};

use crate::context::ServerResources;
use crate::middleware::cookies::{
    clear_sign_in_intent_cookie, get_cookie_value, sign_in_intent_cookie, SIGN_IN_INTENT_COOKIE,
};
use crate::verification::requires_verification;

/// Query for starting a sign-in
#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    /// Role chosen on the sign-in screen
    #[serde(default)]
    pub user_type: Option<String>,
}

/// Provider callback query
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code
    #[serde(default)]
    pub code: Option<String>,
    /// Opaque state from the sign-in redirect
    #[serde(default)]
    pub state: Option<String>,
    /// Provider-reported error
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of a completed sign-in
#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    /// Session token for the `Authorization: Bearer` header
    pub token: String,
    /// Resolved profile
    pub profile: UserProfile,
    /// Whether the caller must verify their phone before continuing
    pub requires_verification: bool,
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/sign-in", get(Self::handle_sign_in))
            .route("/auth/callback", get(Self::handle_callback))
            .route("/auth/sign-out", post(Self::handle_sign_out))
            .with_state(resources)
    }

    async fn handle_sign_in(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<SignInQuery>,
    ) -> Result<Response, AppError> {
        let hint = query
            .user_type
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(str::parse::<UserType>)
            .transpose()?;

        let redirect = resources.resolver.begin_sign_in(hint).await?;
        let cookie = sign_in_intent_cookie(
            &redirect.intent_key,
            resources.config.environment.is_production(),
        );
        Ok((
            [(header::SET_COOKIE, cookie)],
            Redirect::to(&redirect.url),
        )
            .into_response())
    }

    async fn handle_callback(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<CallbackQuery>,
    ) -> Result<Response, AppError> {
        if let Some(error) = query.error {
            warn!(%error, "Identity provider returned an error");
            return Err(AppError::auth_invalid(format!("Sign-in failed: {error}")));
        }
        let code = query
            .code
            .ok_or_else(|| AppError::invalid_input("Missing authorization code"))?;

        let signed_in = resources
            .resolver
            .complete_sign_in(
                &code,
                query.state.as_deref(),
                get_cookie_value(&headers, SIGN_IN_INTENT_COOKIE).as_deref(),
            )
            .await?;
        let token = resources.sessions.issue(&signed_in.profile)?;

        let response = SignInResponse {
            token,
            requires_verification: requires_verification(&signed_in.profile),
            profile: signed_in.profile,
        };
        Ok((
            StatusCode::OK,
            [(header::SET_COOKIE, clear_sign_in_intent_cookie())],
            Json(response),
        )
            .into_response())
    }

    async fn handle_sign_out(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        resources.sign_out(&user.user_id).await;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
