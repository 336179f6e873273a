// ABOUTME: Device location and availability route handlers
// ABOUTME: Accepts position reports and exposes the tracker state
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
use serde::Deserialize;
use tracing::debug;
use wastelink_core::errors::AppError;
use wastelink_core::models::Coordinates;

use crate::auth::AuthenticatedUser;
use crate::context::ServerResources;
use crate::geolocation::DeviceLocation;

/// Body for toggling availability
#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    /// Whether the user is available for work
    pub available: bool,
}

/// Location routes
pub struct LocationRoutes;

impl LocationRoutes {
    /// Create all location routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/location",
                get(Self::handle_get_location)
                    .put(Self::handle_report_location)
                    .delete(Self::handle_revoke_location),
            )
            .route("/api/availability", post(Self::handle_set_availability))
            .with_state(resources)
    }

    async fn device_for(
        resources: &ServerResources,
        user: &AuthenticatedUser,
    ) -> Arc<DeviceLocation> {
        let profile = resources.resolver.fetch_profile(&user.identity()).await;
        resources
            .trackers
            .get_or_create(&user.user_id, profile.is_collector())
    }

    async fn refresh(device: &DeviceLocation, user_id: &str) {
        if let Err(e) = device.tracker.get_current_location().await {
            debug!(user_id, error = %e, "Position request failed");
        }
    }

    async fn handle_get_location(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let device = Self::device_for(&resources, &user).await;
        Ok((StatusCode::OK, Json(device.tracker.snapshot().await)).into_response())
    }

    async fn handle_report_location(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(coordinates): Json<Coordinates>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        coordinates.validate()?;

        let device = Self::device_for(&resources, &user).await;
        device.source.report(coordinates);
        Self::refresh(&device, &user.user_id).await;
        Ok((StatusCode::OK, Json(device.tracker.snapshot().await)).into_response())
    }

    async fn handle_revoke_location(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let device = Self::device_for(&resources, &user).await;
        device.source.revoke();
        Self::refresh(&device, &user.user_id).await;
        Ok((StatusCode::OK, Json(device.tracker.snapshot().await)).into_response())
    }

    async fn handle_set_availability(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<AvailabilityRequest>,
    ) -> Result<Response, AppError> {
        let user = resources.sessions.authenticate(&headers)?;
        let device = Self::device_for(&resources, &user).await;
        device.tracker.set_available(request.available).await;
        Ok((StatusCode::OK, Json(device.tracker.snapshot().await)).into_response())
    }
}
