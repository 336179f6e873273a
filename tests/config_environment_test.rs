// ABOUTME: Integration tests for environment-driven server configuration
// ABOUTME: Covers defaults, overrides, malformed values, and the production secret requirement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;
use std::time::Duration;

use serial_test::serial;
use wastelink_server::config::{DatabaseUrl, Environment, LogLevel, ServerConfig};
use wastelink_server::errors::ErrorCode;

const VARS: &[&str] = &[
    "ENVIRONMENT",
    "SESSION_SECRET",
    "HTTP_PORT",
    "RUST_LOG",
    "DATABASE_URL",
    "OAUTH_CLIENT_ID",
    "OAUTH_AUTH_URL",
    "OAUTH_TOKEN_URL",
    "OAUTH_USERINFO_URL",
    "OAUTH_SCOPES",
    "VERIFY_SERVICE_URL",
    "VERIFY_API_KEY",
    "SESSION_EXPIRY_HOURS",
    "MATCH_RADIUS_KM",
    "PROFILE_FETCH_TIMEOUT_MS",
    "CORS_ALLOWED_ORIGINS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 8081);
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!((config.matching.radius_km - 4.0).abs() < f64::EPSILON);
    assert_eq!(
        config.resolver.profile_fetch_timeout,
        Duration::from_secs(2)
    );
    assert_eq!(config.session.expiry_hours, 24);
    assert!(!config.identity_provider.is_configured());
    assert!(config.messaging.base_url.is_none());
    assert_eq!(config.identity_provider.scopes, ["openid", "email", "profile"]);
}

#[test]
#[serial]
fn test_overrides_are_applied() {
    clear_env();
    env::set_var("HTTP_PORT", "9090");
    env::set_var("DATABASE_URL", "sqlite::memory:");
    env::set_var("MATCH_RADIUS_KM", "7.5");
    env::set_var("PROFILE_FETCH_TIMEOUT_MS", "500");
    env::set_var("OAUTH_CLIENT_ID", "client");
    env::set_var("OAUTH_AUTH_URL", "https://id.example.test/authorize");
    env::set_var("OAUTH_TOKEN_URL", "https://id.example.test/token");
    env::set_var("OAUTH_USERINFO_URL", "https://id.example.test/userinfo");
    env::set_var("VERIFY_SERVICE_URL", "https://verify.example.test");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.http_port, 9090);
    assert_eq!(config.database.url, DatabaseUrl::Memory);
    assert!((config.matching.radius_km - 7.5).abs() < f64::EPSILON);
    assert_eq!(
        config.resolver.profile_fetch_timeout,
        Duration::from_millis(500)
    );
    assert!(config.identity_provider.is_configured());
    assert_eq!(
        config.messaging.base_url.as_deref(),
        Some("https://verify.example.test")
    );

    let summary = config.summary();
    assert!(summary.contains("HTTP Port: 9090"));
    assert!(summary.contains("Identity Provider: Configured"));
}

#[test]
#[serial]
fn test_malformed_value_is_a_config_error() {
    clear_env();
    env::set_var("HTTP_PORT", "eighty");

    let err = ServerConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(err.code, ErrorCode::ConfigError);
    assert!(err.message.contains("HTTP_PORT"));
}

#[test]
#[serial]
fn test_production_requires_session_secret() {
    clear_env();
    env::set_var("ENVIRONMENT", "production");
    let missing = ServerConfig::from_env();

    env::set_var("SESSION_SECRET", "a-production-secret-of-reasonable-length");
    let present = ServerConfig::from_env();
    clear_env();

    assert_eq!(missing.unwrap_err().code, ErrorCode::ConfigError);
    let config = present.unwrap();
    assert!(config.environment.is_production());
}

#[test]
#[serial]
fn test_summary_never_contains_secrets() {
    clear_env();
    env::set_var("SESSION_SECRET", "super-secret-value");
    env::set_var("VERIFY_API_KEY", "verify-api-key-value");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    let summary = config.summary();
    assert!(!summary.contains("super-secret-value"));
    assert!(!summary.contains("verify-api-key-value"));
}

#[test]
fn test_environment_parsing() {
    assert_eq!(
        Environment::from_str_or_default("PROD"),
        Environment::Production
    );
    assert_eq!(Environment::from_str_or_default("test"), Environment::Testing);
    assert_eq!(
        Environment::from_str_or_default("staging"),
        Environment::Development
    );
}
