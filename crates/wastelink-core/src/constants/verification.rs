// ABOUTME: Phone verification constants
// ABOUTME: Code length and the client-side resend cooldown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// Number of digits in a verification code
pub const CODE_LENGTH: usize = 6;

/// Cooldown before another code may be sent
pub const RESEND_COOLDOWN_SECS: u64 = 60;
