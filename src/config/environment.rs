// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

//! Environment-based configuration management for production deployment

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wastelink_core::constants::{identity, matching};
use wastelink_core::errors::{AppError, AppResult};

use crate::cache::CacheConfig;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug output
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(s)
    }
}

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string; anything without a `sqlite:` prefix is treated as a file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/wastelink.db"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: DatabaseUrl,
}

/// External identity provider (`OAuth2`) configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Userinfo endpoint URL
    pub userinfo_url: String,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
    /// Scopes to request
    pub scopes: Vec<String>,
}

impl IdentityProviderConfig {
    /// Whether enough is configured to start a sign-in
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.auth_url.is_empty()
            && !self.token_url.is_empty()
            && !self.userinfo_url.is_empty()
            && !self.redirect_uri.is_empty()
    }
}

/// Phone verification messaging service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Base URL of the verification service
    pub base_url: Option<String>,
    /// API key for the verification service
    pub api_key: Option<String>,
    /// Delivery channel
    pub channel: String,
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC secret for session tokens
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Session lifetime in hours
    pub expiry_hours: i64,
}

/// Cross-origin settings for browser clients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated origins, or `*`
    pub allowed_origins: String,
}

/// Proximity matching configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Admission radius for available requests
    pub radius_km: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            radius_km: matching::DEFAULT_RADIUS_KM,
        }
    }
}

/// Identity resolver configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Budget for a remote profile fetch before falling back
    pub profile_fetch_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            profile_fetch_timeout: Duration::from_millis(identity::PROFILE_FETCH_TIMEOUT_MS),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Identity provider configuration
    pub identity_provider: IdentityProviderConfig,
    /// Messaging configuration
    pub messaging: MessagingConfig,
    /// Session token configuration
    pub session: SessionConfig,
    /// Proximity matching configuration
    pub matching: MatchingConfig,
    /// Identity resolver configuration
    pub resolver: ResolverConfig,
    /// Cache configuration
    pub cache: CacheConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable is present but malformed,
    /// or if production runs without a session secret
    pub fn from_env() -> AppResult<Self> {
        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development"));

        let jwt_secret = env::var("SESSION_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() && environment.is_production() {
            return Err(AppError::config("SESSION_SECRET must be set in production"));
        }

        Ok(Self {
            http_port: parse_env("HTTP_PORT", 8081)?,
            log_level: LogLevel::from_str_or_default(&env_var_or("RUST_LOG", "info")),
            environment,
            database: DatabaseConfig {
                url: DatabaseUrl::parse_url(&env_var_or("DATABASE_URL", "sqlite:./data/wastelink.db")),
            },
            identity_provider: IdentityProviderConfig {
                client_id: env_var_or("OAUTH_CLIENT_ID", ""),
                client_secret: env_var_or("OAUTH_CLIENT_SECRET", ""),
                auth_url: env_var_or("OAUTH_AUTH_URL", ""),
                token_url: env_var_or("OAUTH_TOKEN_URL", ""),
                userinfo_url: env_var_or("OAUTH_USERINFO_URL", ""),
                redirect_uri: env_var_or("OAUTH_REDIRECT_URI", "http://localhost:8081/auth/callback"),
                scopes: env_var_or("OAUTH_SCOPES", "openid email profile")
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect(),
            },
            messaging: MessagingConfig {
                base_url: env::var("VERIFY_SERVICE_URL").ok(),
                api_key: env::var("VERIFY_API_KEY").ok(),
                channel: env_var_or("VERIFY_CHANNEL", "sms"),
            },
            session: SessionConfig {
                jwt_secret,
                expiry_hours: parse_env("SESSION_EXPIRY_HOURS", identity::SESSION_EXPIRY_HOURS)?,
            },
            matching: MatchingConfig {
                radius_km: parse_env("MATCH_RADIUS_KM", matching::DEFAULT_RADIUS_KM)?,
            },
            resolver: ResolverConfig {
                profile_fetch_timeout: Duration::from_millis(parse_env(
                    "PROFILE_FETCH_TIMEOUT_MS",
                    identity::PROFILE_FETCH_TIMEOUT_MS,
                )?),
            },
            cache: CacheConfig::default(),
            cors: CorsConfig {
                allowed_origins: env_var_or("CORS_ALLOWED_ORIGINS", "*"),
            },
        })
    }

    /// Render a configuration summary safe for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "WasteLink Configuration:\n\
             - Environment: {}\n\
             - HTTP Port: {}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - Identity Provider: {}\n\
             - Phone Verification: {}\n\
             - Match Radius: {} km\n\
             - Profile Fetch Timeout: {} ms",
            self.environment,
            self.http_port,
            self.log_level,
            self.database.url.to_connection_string(),
            if self.identity_provider.is_configured() {
                "Configured"
            } else {
                "Not configured"
            },
            if self.messaging.base_url.is_some() {
                "Configured"
            } else {
                "Not configured"
            },
            self.matching.radius_km,
            self.resolver.profile_fetch_timeout.as_millis(),
        )
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T>(key: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
