// ABOUTME: Waste pickup request models and the request status lifecycle
// ABOUTME: WasteRequest, WasteType, RequestStatus, and NewWasteRequest definitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Coordinates;
use crate::errors::{AppError, AppResult};

/// Kind of waste to be collected
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WasteType {
    /// Mixed household waste
    General,
    /// Paper, plastic, glass, metal
    Recyclable,
    /// Food and garden waste
    Organic,
    /// Electronics and batteries
    Electronic,
    /// Chemicals, paint, medical waste
    Hazardous,
    /// Furniture and other large items
    Bulky,
}

impl WasteType {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Recyclable => "recyclable",
            Self::Organic => "organic",
            Self::Electronic => "electronic",
            Self::Hazardous => "hazardous",
            Self::Bulky => "bulky",
        }
    }
}

impl FromStr for WasteType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "recyclable" => Ok(Self::Recyclable),
            "organic" => Ok(Self::Organic),
            "electronic" => Ok(Self::Electronic),
            "hazardous" => Ok(Self::Hazardous),
            "bulky" => Ok(Self::Bulky),
            _ => Err(AppError::invalid_input(format!("Invalid waste type: {s}"))),
        }
    }
}

/// Status of a pickup request
///
/// `pending → matched → in_progress → completed`, with `cancelled`
/// reachable from `pending` only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Open and claimable
    Pending,
    /// Claimed by a collector
    Matched,
    /// Collector is on the job
    InProgress,
    /// Pickup done
    Completed,
    /// Withdrawn by the dumper before it was claimed
    Cancelled,
}

impl RequestStatus {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Matched => "matched",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a request in this status must have a collector assigned
    #[must_use]
    pub const fn holds_collector(&self) -> bool {
        matches!(self, Self::Matched | Self::InProgress | Self::Completed)
    }

    /// The status a collector may advance to from this one
    #[must_use]
    pub const fn collector_successor(&self) -> Option<Self> {
        match self {
            Self::Matched => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Pending | Self::Completed | Self::Cancelled => None,
        }
    }

    /// Whether no further transitions are possible
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "matched" => Ok(Self::Matched),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(AppError::invalid_input(format!(
                "Invalid request status: {s}"
            ))),
        }
    }
}

/// A pickup request shared between its dumper and at most one collector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteRequest {
    /// Request identifier
    pub id: Uuid,
    /// Profile id of the dumper who created it
    pub dumper_id: String,
    /// Profile id of the claiming collector; set iff status holds a collector
    pub collector_id: Option<String>,
    /// Kind of waste
    pub waste_type: WasteType,
    /// Free-form notes
    pub description: Option<String>,
    /// Pickup location
    pub location: Coordinates,
    /// Human-readable pickup address
    pub address: String,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Requested pickup time
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Estimated amount in kilograms
    pub estimated_amount: Option<f64>,
    /// Photo URLs
    pub photos: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last transition
    pub updated_at: DateTime<Utc>,
}

impl WasteRequest {
    /// Whether `collector_id` agrees with `status`
    #[must_use]
    pub const fn collector_invariant_holds(&self) -> bool {
        self.status.holds_collector() == self.collector_id.is_some()
    }

    /// Whether the given profile is the dumper or the assigned collector
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.dumper_id == user_id || self.collector_id.as_deref() == Some(user_id)
    }
}

/// Input for creating a pickup request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewWasteRequest {
    /// Kind of waste
    pub waste_type: WasteType,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
    /// Pickup location
    pub location: Coordinates,
    /// Human-readable pickup address
    pub address: String,
    /// Requested pickup time
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Estimated amount in kilograms
    #[serde(default)]
    pub estimated_amount: Option<f64>,
    /// Photo URLs
    #[serde(default)]
    pub photos: Vec<String>,
}

impl NewWasteRequest {
    /// Validate user-supplied fields
    ///
    /// # Errors
    ///
    /// Returns an invalid input error describing the first bad field
    pub fn validate(&self) -> AppResult<()> {
        if self.address.trim().is_empty() {
            return Err(AppError::invalid_input("Address is required"));
        }
        self.location.validate()?;
        if let Some(amount) = self.estimated_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(AppError::invalid_input(
                    "Estimated amount must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}
