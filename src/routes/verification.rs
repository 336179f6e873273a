// ABOUTME: Phone verification route handlers
// ABOUTME: Status, code sending, and code checking for the signed-in user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use wastelink_core::errors::AppError;

use super::profile::ProfileResponse;
use crate::context::ServerResources;
use crate::verification::{requires_verification, VerificationSnapshot};

/// Body for sending a code
#[derive(Debug, Default, Deserialize)]
pub struct SendCodeRequest {
    /// Number to verify; defaults to the phone on the profile
    #[serde(default)]
    pub phone: Option<String>,
}

/// Body for checking a code
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    /// The six-digit code
    pub code: String,
}

/// Verification status with the routing decision
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationStatusResponse {
    /// Gate state
    pub verification: VerificationSnapshot,
    /// Whether phone verification must happen before the dashboard
    pub requires_verification: bool,
}

/// Verification routes
pub struct VerificationRoutes;

impl VerificationRoutes {
    /// Create all verification routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/verification", get(Self::handle_status))
            .route("/api/verification/send", post(Self::handle_send))
            .route("/api/verification/verify", post(Self::handle_verify))
            .with_state(resources)
    }

    async fn handle_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let profile = resources.resolver.fetch_profile(&user.identity()).await;

        let response = VerificationStatusResponse {
            verification: resources.verification.snapshot(&user.user_id),
            requires_verification: requires_verification(&profile),
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_send(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<SendCodeRequest>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;

        let phone = match request.phone.filter(|p| !p.trim().is_empty()) {
            Some(phone) => phone,
            None => resources
                .resolver
                .fetch_profile(&user.identity())
                .await
                .phone
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| AppError::invalid_input("No phone number on file"))?,
        };

        resources
            .verification
            .send_phone_verification(&user.user_id, &phone)
            .await?;

        let snapshot = resources.verification.snapshot(&user.user_id);
        Ok((StatusCode::ACCEPTED, Json(snapshot)).into_response())
    }

    async fn handle_verify(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<VerifyCodeRequest>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let profile = resources
            .verification
            .verify_phone_code(&user.identity(), &request.code)
            .await?;
        Ok((StatusCode::OK, Json(ProfileResponse::from(profile))).into_response())
    }
}
