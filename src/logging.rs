// ABOUTME: Logging configuration and structured logging setup for observability and debugging
// ABOUTME: Selects json, pretty, or compact output and applies noise reduction filters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 WasteLink

//! Structured logging setup built on `tracing-subscriber`
//!
//! Everything is driven by environment variables so the binary and the
//! integration tests agree on behavior:
//!
//! - `RUST_LOG`: filter directives, default `info`
//! - `LOG_FORMAT`: `json`, `compact`, anything else is pretty
//! - `LOG_INCLUDE_LOCATION`, `LOG_INCLUDE_SPANS`: presence enables
//! - `ENVIRONMENT`: `production` always records source locations

use std::env;
use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use wastelink_core::constants::service_names;

/// Dependencies that log far more than the service itself at `info`
const QUIET_DIRECTIVES: [&str; 5] = [
    "hyper=warn",
    "hyper::proto=warn",
    "reqwest=warn",
    "sqlx=warn",
    "tower_http=info",
];

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers
    Json,
    /// Multi-line human output
    Pretty,
    /// Single-line human output
    Compact,
}

impl LogFormat {
    fn from_env_value(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("json") => Self::Json,
            Some("compact") => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base filter directive, e.g. `info` or `wastelink_server=debug`
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include span open/close events
    pub include_spans: bool,
    /// Reported in the startup banner
    pub service_name: String,
    /// Reported in the startup banner
    pub service_version: String,
    /// Deployment environment name
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            service_name: service_names::WASTELINK_SERVER.to_owned(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: "development".to_owned(),
        }
    }
}

impl LoggingConfig {
    /// Read the logging variables, falling back to [`LoggingConfig::default`]
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);

        Self {
            level: env::var("RUST_LOG").unwrap_or(defaults.level),
            format: LogFormat::from_env_value(env::var("LOG_FORMAT").ok().as_deref()),
            include_location: environment == "production"
                || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: defaults.service_version,
            environment,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let own = format!("wastelink_server={}", self.level);
        QUIET_DIRECTIVES
            .iter()
            .copied()
            .chain(std::iter::once(own.as_str()))
            .filter_map(|directive| directive.parse::<Directive>().ok())
            .fold(EnvFilter::new(&self.level), EnvFilter::add_directive)
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Install the global tracing subscriber and log the startup banner
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let base = fmt::layer()
            .with_writer(io::stdout)
            .with_span_events(self.span_events());

        match self.format {
            LogFormat::Json => registry
                .with(
                    base.json()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_current_span(self.include_spans),
                )
                .try_init()?,
            LogFormat::Pretty => registry
                .with(
                    base.with_file(self.include_location)
                        .with_line_number(self.include_location),
                )
                .try_init()?,
            LogFormat::Compact => registry.with(base.compact().with_target(false)).try_init()?,
        }

        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "WasteLink server starting up"
        );
        Ok(())
    }
}

/// Initialize logging from environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}
