// ABOUTME: Great-circle distance between coordinates using the haversine formula
// ABOUTME: Spherical Earth approximation with a 6371 km mean radius
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use wastelink_core::constants::matching::EARTH_RADIUS_KM;
use wastelink_core::models::Coordinates;

/// Haversine distance in kilometres
///
/// Ellipsoidal error is at most about 0.5%, well inside what a
/// few-kilometre admission radius cares about.
#[must_use]
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
