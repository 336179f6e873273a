// ABOUTME: Geographic coordinate pair used by requests and the location tracker
// ABOUTME: Validates latitude and longitude ranges
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, -90..=90
    pub lat: f64,
    /// Longitude in degrees, -180..=180
    pub lng: f64,
}

impl Coordinates {
    /// Create a coordinate pair without validation
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both components are finite and in range
    ///
    /// # Errors
    ///
    /// Returns an invalid input error for out-of-range or non-finite values
    pub fn validate(&self) -> AppResult<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::invalid_input(format!(
                "Latitude {} is out of range",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::invalid_input(format!(
                "Longitude {} is out of range",
                self.lng
            )));
        }
        Ok(())
    }
}
