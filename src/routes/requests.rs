// ABOUTME: Pickup request route handlers for dumpers and collectors
// ABOUTME: Create, browse nearby work, claim, advance, and cancel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wastelink_core::errors::AppError;
use wastelink_core::models::{Coordinates, NewWasteRequest, RequestStatus, WasteRequest};

use crate::context::ServerResources;
use crate::database_plugins::ClaimOutcome;
use crate::matching::NearbyRequest;

/// Body for advancing a request
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    /// Target status
    pub status: RequestStatus,
}

/// Nearby work for a collector
#[derive(Debug, Serialize)]
pub struct AvailableResponse {
    /// Claimable requests, nearest first
    pub requests: Vec<NearbyRequest>,
    /// Radius the list was filtered with
    pub radius_km: f64,
    /// Position the distances were measured from
    pub location: Option<Coordinates>,
}

/// Requests the caller created or holds
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestListResponse {
    /// Matching requests
    pub requests: Vec<WasteRequest>,
    /// Number of requests
    pub total: usize,
}

/// Pickup request routes
pub struct RequestRoutes;

impl RequestRoutes {
    /// Create all request routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/requests", post(Self::handle_create))
            .route("/api/requests/available", get(Self::handle_available))
            .route("/api/requests/mine", get(Self::handle_mine))
            .route("/api/requests/:id", get(Self::handle_get))
            .route("/api/requests/:id/accept", post(Self::handle_accept))
            .route("/api/requests/:id/advance", post(Self::handle_advance))
            .route("/api/requests/:id/cancel", post(Self::handle_cancel))
            .with_state(resources)
    }

    fn parse_id(raw: &str) -> Result<Uuid, AppError> {
        Uuid::parse_str(raw)
            .map_err(|_| AppError::invalid_input(format!("Invalid request id: {raw}")))
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(input): Json<NewWasteRequest>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let profile = resources.resolver.fetch_profile(&user.identity()).await;
        let request = resources.requests.create(&profile, input).await?;
        Ok((StatusCode::CREATED, Json(request)).into_response())
    }

    async fn handle_available(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let profile = resources.resolver.fetch_profile(&user.identity()).await;

        let here = match resources.trackers.get(&user.user_id) {
            Some(device) => device.tracker.coordinates().await,
            None => None,
        };
        let requests = resources.requests.available_for(&profile, here).await?;

        let response = AvailableResponse {
            requests,
            radius_km: resources.requests.radius_km(),
            location: here,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_mine(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let requests = resources.requests.mine(&user.user_id).await?;
        let response = RequestListResponse {
            total: requests.len(),
            requests,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let request = resources
            .requests
            .get(&user.user_id, Self::parse_id(&id)?)
            .await?;
        Ok((StatusCode::OK, Json(request)).into_response())
    }

    async fn handle_accept(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let profile = resources.resolver.fetch_profile(&user.identity()).await;

        match resources
            .requests
            .accept(Self::parse_id(&id)?, &profile)
            .await?
        {
            ClaimOutcome::Claimed(request) => Ok((StatusCode::OK, Json(request)).into_response()),
            ClaimOutcome::AlreadyClaimed => Err(AppError::unavailable(
                "This request has already been accepted by another collector",
            )),
        }
    }

    async fn handle_advance(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<AdvanceRequest>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let request = resources
            .requests
            .advance(Self::parse_id(&id)?, &user.user_id, body.status)
            .await?;
        Ok((StatusCode::OK, Json(request)).into_response())
    }

    async fn handle_cancel(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let request = resources
            .requests
            .cancel(Self::parse_id(&id)?, &user.user_id)
            .await?;
        Ok((StatusCode::OK, Json(request)).into_response())
    }
}
