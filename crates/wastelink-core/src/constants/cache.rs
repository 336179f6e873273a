// ABOUTME: Cache-related constants for TTLs and cleanup intervals
// ABOUTME: Profile entries use a short TTL when they hold a synthesized fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// Default cleanup interval in seconds for expired entries
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300; // 5 minutes

/// "Profile row exists" marker TTL
pub const TTL_PROFILE_EXISTS_SECS: u64 = 300; // 5 minutes

/// Fetched profile TTL
pub const TTL_PROFILE_SECS: u64 = 300; // 5 minutes

/// Synthesized fallback profile TTL, short so recovery is attempted soon
pub const TTL_FALLBACK_PROFILE_SECS: u64 = 60; // 1 minute

/// Key prefix for the profile existence marker
pub const PROFILE_EXISTS_PREFIX: &str = "profile_exists";

/// Key prefix for cached profiles
pub const PROFILE_PREFIX: &str = "profile";
