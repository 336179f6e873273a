// ABOUTME: Main library entry point for the WasteLink pickup matching server
// ABOUTME: Connects dumpers' pickup requests with nearby collectors over a REST API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

#![deny(unsafe_code)]

//! # WasteLink Server
//!
//! Dumpers post waste pickup requests; collectors nearby claim and complete
//! them. The server resolves external sign-ins into profiles, gates new
//! phone numbers behind a one-time code, tracks collector positions, and
//! arbitrates concurrent claims through the store.
//!
//! ## Architecture
//!
//! - **Identity**: `OAuth2` sign-in, profile resolution with caching and a
//!   degraded fallback profile
//! - **Verification**: phone one-time codes through an external messaging service
//! - **Geolocation**: per-user trackers fed by device reports
//! - **Matching**: distance filtering of claimable work
//! - **Lifecycle**: race-safe claim and status transitions
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use wastelink_server::config::ServerConfig;
//! use wastelink_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("WasteLink configured on port {}", config.http_port);
//!     Ok(())
//! }
//! ```

// ── Public API ──────────────────────────────────────────────────────────
// Used by the server binary and by integration tests.

/// Session tokens and request authentication
pub mod auth;
/// Process-local TTL cache
pub mod cache;
/// Environment-driven configuration
pub mod config;
/// Shared resources handed to route handlers
pub mod context;
/// Persistent store abstraction and `SQLite` implementation
pub mod database_plugins;
/// Device position tracking
pub mod geolocation;
/// External sign-in and profile resolution
pub mod identity;
/// Pickup request lifecycle
pub mod lifecycle;
/// Structured logging setup
pub mod logging;
/// Distance-based request matching
pub mod matching;
/// HTTP middleware
pub mod middleware;
/// HTTP routes
pub mod routes;
/// Phone verification gate
pub mod verification;

/// Application constants
pub use wastelink_core::constants;
/// Unified error handling with standard error codes and HTTP responses
pub use wastelink_core::errors;
/// Domain models
pub use wastelink_core::models;
