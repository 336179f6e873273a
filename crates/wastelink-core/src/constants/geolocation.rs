// ABOUTME: Geolocation request options and auto-refresh cadence
// ABOUTME: Mirrors the platform high-accuracy position request defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// Position request timeout
pub const POSITION_TIMEOUT_SECS: u64 = 15;

/// Maximum age of a cached platform fix that may be reused
pub const POSITION_MAXIMUM_AGE_SECS: u64 = 300; // 5 minutes

/// Auto-refresh interval while the caller is available
pub const REFRESH_INTERVAL_SECS: u64 = 300; // 5 minutes
