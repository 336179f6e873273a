// ABOUTME: Core data models shared by the server and its tests
// ABOUTME: Profiles, waste requests, coordinates, and pending sign-in intents
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

mod location;
mod request;
mod user;

pub use location::Coordinates;
pub use request::{NewWasteRequest, RequestStatus, WasteRequest, WasteType};
pub use user::{PendingIntent, ProfileUpdate, UserProfile, UserType};
