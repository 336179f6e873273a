// ABOUTME: Core types and constants for the WasteLink pickup matching platform
// ABOUTME: Foundation crate with error handling, domain models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

#![deny(unsafe_code)]

//! # WasteLink Core
//!
//! Foundation crate providing shared types and constants for the WasteLink
//! platform. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `AppResult`
//! - **constants**: Application-wide constants organized by domain
//! - **models**: Profiles, waste requests, coordinates, and pending intents

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants and configuration values organized by domain
pub mod constants;

/// Core data models (profiles, waste requests, coordinates)
pub mod models;
