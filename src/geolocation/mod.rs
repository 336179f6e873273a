// ABOUTME: Per-user location tracking with best-effort persistence and periodic refresh
// ABOUTME: Keeps the last good fix across failures and stops refreshing when the user goes unavailable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

//! # Geolocation Tracker
//!
//! A tracker asks its [`PositionSource`] for the caller's position, remembers
//! the last good fix, and classifies failures without forgetting that fix.
//! While the caller is available and a fix is known, it re-locates on a
//! fixed interval. The refresh task is aborted when availability is turned
//! off or the tracker is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wastelink_core::constants::geolocation::REFRESH_INTERVAL_SECS;
use wastelink_core::models::Coordinates;

use crate::database_plugins::DatabaseProvider;

/// Position capability and the device-reported implementation
pub mod source;

pub use source::{
    PositionError, PositionErrorKind, PositionOptions, PositionSource, ReportedPositionSource,
};

#[derive(Debug, Default)]
struct TrackerState {
    coordinates: Option<Coordinates>,
    error: Option<PositionError>,
    last_updated: Option<DateTime<Utc>>,
    is_available: bool,
}

/// Point-in-time view of a tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    /// Last good fix
    pub coordinates: Option<Coordinates>,
    /// Last failure, cleared by the next success
    pub error: Option<PositionError>,
    /// Time of the last good fix
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether the user marked themselves available
    pub is_available: bool,
    /// Whether periodic refresh is running
    pub auto_refresh: bool,
}

struct Inner {
    user_id: String,
    is_collector: AtomicBool,
    source: Arc<dyn PositionSource>,
    database: Arc<dyn DatabaseProvider>,
    options: PositionOptions,
    state: RwLock<TrackerState>,
}

impl Inner {
    async fn locate(&self) -> Result<Coordinates, PositionError> {
        match self.source.current_position(self.options).await {
            Ok(coordinates) => {
                let now = Utc::now();
                {
                    let mut state = self.state.write().await;
                    state.coordinates = Some(coordinates);
                    state.error = None;
                    state.last_updated = Some(now);
                }
                if self.is_collector.load(Ordering::Relaxed) {
                    self.push_location(coordinates, now).await;
                }
                Ok(coordinates)
            }
            Err(e) => {
                debug!(user_id = %self.user_id, kind = e.kind.as_str(), "Position request failed");
                self.state.write().await.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Advisory write; failures are logged and dropped
    async fn push_location(&self, coordinates: Coordinates, at: DateTime<Utc>) {
        match self
            .database
            .update_profile_location(&self.user_id, coordinates, at)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(user_id = %self.user_id, "No profile row for location push"),
            Err(e) => warn!(user_id = %self.user_id, error = %e, "Location push failed"),
        }
    }

    async fn wants_refresh(&self) -> bool {
        let state = self.state.read().await;
        state.is_available && state.coordinates.is_some()
    }
}

/// Tracks one user's position
pub struct GeolocationTracker {
    inner: Arc<Inner>,
    refresh_interval: Duration,
    refresh: Mutex<Option<JoinHandle<()>>>,
}

impl GeolocationTracker {
    /// Create a tracker with default options and refresh interval
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        is_collector: bool,
        source: Arc<dyn PositionSource>,
        database: Arc<dyn DatabaseProvider>,
    ) -> Self {
        Self::with_options(
            user_id,
            is_collector,
            source,
            database,
            PositionOptions::default(),
            Duration::from_secs(REFRESH_INTERVAL_SECS),
        )
    }

    /// Create a tracker with explicit options and refresh interval
    #[must_use]
    pub fn with_options(
        user_id: impl Into<String>,
        is_collector: bool,
        source: Arc<dyn PositionSource>,
        database: Arc<dyn DatabaseProvider>,
        options: PositionOptions,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                user_id: user_id.into(),
                is_collector: AtomicBool::new(is_collector),
                source,
                database,
                options,
                state: RwLock::new(TrackerState::default()),
            }),
            refresh_interval,
            refresh: Mutex::new(None),
        }
    }

    /// Request a position now
    ///
    /// On success the fix replaces the previous one and, for collectors, is
    /// pushed to the profile. On failure the previous fix is kept.
    ///
    /// # Errors
    ///
    /// Returns the classified position error
    pub async fn get_current_location(&self) -> Result<Coordinates, PositionError> {
        let result = self.inner.locate().await;
        self.sync_refresh().await;
        result
    }

    /// Mark the user available or unavailable for work
    pub async fn set_available(&self, available: bool) {
        self.inner.state.write().await.is_available = available;
        self.sync_refresh().await;
        info!(user_id = %self.inner.user_id, available, "Availability changed");
    }

    /// Update whether location pushes apply to this user
    pub fn set_collector(&self, is_collector: bool) {
        self.inner.is_collector.store(is_collector, Ordering::Relaxed);
    }

    /// Last good fix
    pub async fn coordinates(&self) -> Option<Coordinates> {
        self.inner.state.read().await.coordinates
    }

    /// Current tracker state
    pub async fn snapshot(&self) -> LocationSnapshot {
        let auto_refresh = self.is_refreshing();
        let state = self.inner.state.read().await;
        LocationSnapshot {
            coordinates: state.coordinates,
            error: state.error.clone(),
            last_updated: state.last_updated,
            is_available: state.is_available,
            auto_refresh,
        }
    }

    /// Whether the periodic refresh task is running
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start or stop the refresh task to match availability and fix state
    async fn sync_refresh(&self) {
        let wanted = self.inner.wants_refresh().await;
        let mut slot = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);

        if !wanted {
            if let Some(handle) = slot.take() {
                handle.abort();
                debug!(user_id = %self.inner.user_id, "Location refresh stopped");
            }
            return;
        }

        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let period = self.refresh_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if !inner.wants_refresh().await {
                    break;
                }
                // Failures are recorded in the tracker state
                let _ = inner.locate().await;
            }
        }));
        debug!(user_id = %self.inner.user_id, "Location refresh started");
    }
}

impl Drop for GeolocationTracker {
    fn drop(&mut self) {
        let slot = self
            .refresh
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

/// A signed-in user's device feed and the tracker reading from it
pub struct DeviceLocation {
    /// Receives device reports
    pub source: Arc<ReportedPositionSource>,
    /// Tracks the user's position
    pub tracker: GeolocationTracker,
}

/// One device feed and tracker per signed-in user
pub struct TrackerRegistry {
    trackers: DashMap<String, Arc<DeviceLocation>>,
    database: Arc<dyn DatabaseProvider>,
}

impl TrackerRegistry {
    /// Empty registry
    #[must_use]
    pub fn new(database: Arc<dyn DatabaseProvider>) -> Self {
        Self {
            trackers: DashMap::new(),
            database,
        }
    }

    /// The user's tracker, created on first use
    pub fn get_or_create(&self, user_id: &str, is_collector: bool) -> Arc<DeviceLocation> {
        let device = self
            .trackers
            .entry(user_id.to_owned())
            .or_insert_with(|| {
                let source = Arc::new(ReportedPositionSource::new());
                let tracker = GeolocationTracker::new(
                    user_id,
                    is_collector,
                    Arc::clone(&source) as Arc<dyn PositionSource>,
                    Arc::clone(&self.database),
                );
                Arc::new(DeviceLocation { source, tracker })
            })
            .clone();
        device.tracker.set_collector(is_collector);
        device
    }

    /// The user's tracker, if one exists
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<Arc<DeviceLocation>> {
        self.trackers.get(user_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Discard the user's tracker, stopping its refresh task
    pub fn remove(&self, user_id: &str) {
        self.trackers.remove(user_id);
    }
}
