// ABOUTME: Application-wide constants organized by domain
// ABOUTME: Cache lifetimes, matching radius, verification and geolocation timings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// Cache TTLs and cleanup intervals
pub mod cache;

/// Geolocation request options and refresh cadence
pub mod geolocation;

/// Identity resolution timings and defaults
pub mod identity;

/// Proximity matching constants
pub mod matching;

/// Phone verification constants
pub mod verification;

/// Service names used in logs and token audiences
pub mod service_names {
    /// Server binary and log target
    pub const WASTELINK_SERVER: &str = "wastelink-server";
    /// Audience for issued session tokens
    pub const SESSION_AUDIENCE: &str = "wastelink-api";
}
