// ABOUTME: Profile read and update route handlers
// ABOUTME: Serves the cached profile with its verification routing flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use wastelink_core::errors::AppError;
use wastelink_core::models::{ProfileUpdate, UserProfile, UserType};

use crate::context::ServerResources;
use crate::verification::requires_verification;

/// Fields a user may change directly
///
/// Phone verification is only ever set by the verification flow.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// New phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// New address
    #[serde(default)]
    pub address: Option<String>,
    /// New role
    #[serde(default)]
    pub user_type: Option<UserType>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            full_name: request.full_name.map(|n| n.trim().to_owned()),
            phone: request.phone.map(|p| p.trim().to_owned()),
            address: request.address,
            user_type: request.user_type,
            phone_verified: None,
        }
    }
}

/// Profile plus routing decision
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// The profile
    pub profile: UserProfile,
    /// Whether phone verification must happen before the dashboard
    pub requires_verification: bool,
    /// Replacement session token, present when the update changed the role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            requires_verification: requires_verification(&profile),
            profile,
            token: None,
        }
    }
}

/// Profile routes
pub struct ProfileRoutes;

impl ProfileRoutes {
    /// Create all profile routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/profile",
                get(Self::handle_get_profile).patch(Self::handle_update_profile),
            )
            .with_state(resources)
    }

    async fn handle_get_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let profile = resources.resolver.fetch_profile(&user.identity()).await;
        Ok((StatusCode::OK, Json(ProfileResponse::from(profile))).into_response())
    }

    async fn handle_update_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<UpdateProfileRequest>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let update = ProfileUpdate::from(request);
        if update.is_empty() {
            return Err(AppError::invalid_input("No profile fields to update"));
        }

        let profile = resources
            .resolver
            .update_profile(&user.identity(), &update)
            .await?;

        if let Some(device) = resources.trackers.get(&user.user_id) {
            device.tracker.set_collector(profile.is_collector());
        }

        // The caller's token still names the old role
        let token = if profile.user_type == user.user_type {
            None
        } else {
            info!(user_id = %user.user_id, user_type = %profile.user_type, "Re-issuing session for new role");
            Some(resources.sessions.issue(&profile)?)
        };
        let response = ProfileResponse {
            token,
            ..ProfileResponse::from(profile)
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
