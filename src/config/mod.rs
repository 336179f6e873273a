// ABOUTME: Configuration module root
// ABOUTME: Re-exports the environment-driven server configuration types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// Environment-based configuration
pub mod environment;

pub use environment::{
    CorsConfig, DatabaseConfig, DatabaseUrl, Environment, IdentityProviderConfig, LogLevel,
    MatchingConfig, MessagingConfig, ResolverConfig, ServerConfig, SessionConfig,
};
