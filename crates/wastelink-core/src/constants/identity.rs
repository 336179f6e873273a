// ABOUTME: Identity resolution constants
// ABOUTME: Remote fetch budget and pending intent lifetime
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// Budget for a remote profile fetch before a fallback profile is used
pub const PROFILE_FETCH_TIMEOUT_MS: u64 = 2_000;

/// Pending intents older than this are discarded unread
pub const PENDING_INTENT_TTL_SECS: i64 = 600; // 10 minutes

/// Interval of the stale pending intent purge task
pub const PENDING_INTENT_PURGE_INTERVAL_SECS: u64 = 900; // 15 minutes

/// Display name used when neither a name nor an email is available
pub const FALLBACK_DISPLAY_NAME: &str = "User";

/// Default session lifetime in hours
pub const SESSION_EXPIRY_HOURS: i64 = 24;
