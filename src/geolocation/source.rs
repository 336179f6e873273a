// ABOUTME: Platform position capability and the device-reported implementation
// ABOUTME: Latest-fix channel with maximum-age reuse, bounded waits, and classified failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use wastelink_core::constants::geolocation::{POSITION_MAXIMUM_AGE_SECS, POSITION_TIMEOUT_SECS};
use wastelink_core::models::Coordinates;

/// Options for a position request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for the most precise fix available
    pub enable_high_accuracy: bool,
    /// How long to wait for a fix
    pub timeout: Duration,
    /// Oldest cached fix that may be reused
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(POSITION_TIMEOUT_SECS),
            maximum_age: Duration::from_secs(POSITION_MAXIMUM_AGE_SECS),
        }
    }
}

/// Classified reason a position could not be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorKind {
    /// The user withheld location access
    PermissionDenied,
    /// No position could be determined
    PositionUnavailable,
    /// No fix arrived within the timeout
    Timeout,
    /// Anything else
    Unknown,
}

impl PositionErrorKind {
    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::PositionUnavailable => "position_unavailable",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// User-facing explanation
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location access was denied. Enable location sharing to see nearby requests."
            }
            Self::PositionUnavailable => "Your location could not be determined.",
            Self::Timeout => "Timed out waiting for your location.",
            Self::Unknown => "An unknown error occurred while getting your location.",
        }
    }
}

/// A failed position request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionError {
    /// Classification
    pub kind: PositionErrorKind,
    /// Human-readable message
    pub message: String,
}

impl PositionError {
    /// Error of `kind` with its standard message
    #[must_use]
    pub fn new(kind: PositionErrorKind) -> Self {
        Self {
            kind,
            message: kind.message().to_owned(),
        }
    }
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for PositionError {}

/// Platform geolocation capability
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Obtain the current position
    async fn current_position(&self, options: PositionOptions) -> Result<Coordinates, PositionError>;
}

#[derive(Debug, Clone, Copy)]
enum Share {
    Waiting,
    Fix {
        coordinates: Coordinates,
        received_at: Instant,
    },
    Revoked,
}

/// Positions pushed by the user's device
///
/// The newest report wins. A request reuses it while it is younger than
/// `maximum_age`, otherwise waits up to `timeout` for a fresh one.
pub struct ReportedPositionSource {
    share: watch::Sender<Share>,
}

impl Default for ReportedPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportedPositionSource {
    /// Source with no fix yet
    #[must_use]
    pub fn new() -> Self {
        let (share, _) = watch::channel(Share::Waiting);
        Self { share }
    }

    /// Record a fix from the device; re-enables a revoked share
    pub fn report(&self, coordinates: Coordinates) {
        self.share.send_replace(Share::Fix {
            coordinates,
            received_at: Instant::now(),
        });
    }

    /// The user withdrew location permission
    pub fn revoke(&self) {
        self.share.send_replace(Share::Revoked);
    }
}

fn usable(share: &Share, maximum_age: Duration) -> bool {
    match share {
        Share::Revoked => true,
        Share::Fix { received_at, .. } => received_at.elapsed() <= maximum_age,
        Share::Waiting => false,
    }
}

fn resolve(share: Share) -> Result<Coordinates, PositionError> {
    match share {
        Share::Fix { coordinates, .. } => Ok(coordinates),
        Share::Revoked => Err(PositionError::new(PositionErrorKind::PermissionDenied)),
        Share::Waiting => Err(PositionError::new(PositionErrorKind::PositionUnavailable)),
    }
}

#[async_trait]
impl PositionSource for ReportedPositionSource {
    async fn current_position(&self, options: PositionOptions) -> Result<Coordinates, PositionError> {
        let mut receiver = self.share.subscribe();

        let current = *receiver.borrow_and_update();
        if usable(&current, options.maximum_age) {
            return resolve(current);
        }

        let waited = tokio::time::timeout(
            options.timeout,
            receiver.wait_for(|share| usable(share, options.maximum_age)),
        )
        .await;

        match waited {
            Ok(Ok(share)) => resolve(*share),
            Ok(Err(_closed)) => Err(PositionError::new(PositionErrorKind::PositionUnavailable)),
            Err(_elapsed) => Err(PositionError::new(PositionErrorKind::Timeout)),
        }
    }
}
