// ABOUTME: HTTP middleware shared by every router
// ABOUTME: Cross-origin configuration and sign-in cookies
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 WasteLink

/// Sign-in cookies
pub mod cookies;
/// CORS layer
pub mod cors;

pub use cors::setup_cors;
