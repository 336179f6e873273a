// ABOUTME: Route module organization for WasteLink HTTP endpoints
// ABOUTME: Merges every domain router and applies tracing and CORS layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

//! Route module for the WasteLink server
//!
//! Each domain module holds route definitions and thin handlers that
//! delegate to the services in [`ServerResources`].

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::context::ServerResources;
use crate::middleware::setup_cors;

/// Sign-in, callback, and sign-out
pub mod auth;
/// Liveness and readiness
pub mod health;
/// Device location and availability
pub mod location;
/// Profile read and update
pub mod profile;
/// Pickup requests
pub mod requests;
/// Phone verification
pub mod verification;

pub use auth::AuthRoutes;
pub use health::HealthRoutes;
pub use location::LocationRoutes;
pub use profile::ProfileRoutes;
pub use requests::RequestRoutes;
pub use verification::VerificationRoutes;

/// Build the complete application router
pub fn router(resources: &Arc<ServerResources>) -> Router {
    let cors = setup_cors(&resources.config.cors);

    Router::new()
        .merge(HealthRoutes::routes(Arc::clone(resources)))
        .merge(AuthRoutes::routes(Arc::clone(resources)))
        .merge(ProfileRoutes::routes(Arc::clone(resources)))
        .merge(VerificationRoutes::routes(Arc::clone(resources)))
        .merge(LocationRoutes::routes(Arc::clone(resources)))
        .merge(RequestRoutes::routes(Arc::clone(resources)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
