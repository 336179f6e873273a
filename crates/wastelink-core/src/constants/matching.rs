// ABOUTME: Proximity matching constants
// ABOUTME: Admission radius and the spherical Earth model used for distances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

/// Mean Earth radius in kilometres (haversine model)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default admission radius for available requests
pub const DEFAULT_RADIUS_KM: f64 = 4.0;
