// ABOUTME: Shared test helpers for HTTP integration tests
// ABOUTME: Exports the in-process router request builder
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod axum_test;
