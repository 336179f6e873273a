// ABOUTME: Proximity filtering of the shared request pool for collectors and owners
// ABOUTME: Available work within the radius of a known position, plus every request a user is party to
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use wastelink_core::models::{Coordinates, RequestStatus, WasteRequest};

/// Haversine distance
pub mod distance;

pub use distance::haversine_km;

/// An available request annotated with its distance from the caller
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NearbyRequest {
    /// The request
    #[serde(flatten)]
    pub request: WasteRequest,
    /// Distance from the caller in kilometres
    pub distance_km: f64,
}

/// Requests a collector could claim, nearest first
///
/// A request qualifies when it is pending with no collector, was not created
/// by `self_id`, and lies within `radius_km` of `here`. With no known
/// position nothing qualifies.
#[must_use]
pub fn available_requests(
    pool: &[WasteRequest],
    self_id: &str,
    here: Option<Coordinates>,
    radius_km: f64,
) -> Vec<NearbyRequest> {
    let Some(here) = here else {
        return Vec::new();
    };

    let mut nearby: Vec<NearbyRequest> = pool
        .iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .filter(|r| r.collector_id.is_none())
        .filter(|r| r.dumper_id != self_id)
        .filter_map(|r| {
            let distance_km = haversine_km(here, r.location);
            (distance_km <= radius_km).then(|| NearbyRequest {
                request: r.clone(),
                distance_km,
            })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

/// Every request the user created or holds, regardless of distance
#[must_use]
pub fn my_requests(pool: &[WasteRequest], self_id: &str) -> Vec<WasteRequest> {
    pool.iter().filter(|r| r.involves(self_id)).cloned().collect()
}
