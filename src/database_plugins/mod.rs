// ABOUTME: Storage abstraction for profiles, pending intents, and pickup requests
// ABOUTME: Object-safe provider trait with conditional-write primitives for claims and transitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use wastelink_core::errors::AppResult;
use wastelink_core::models::{
    Coordinates, PendingIntent, RequestStatus, UserProfile, WasteRequest,
};

pub mod sqlite;

pub use sqlite::SqliteDatabase;

/// Result of inserting a row keyed by an externally assigned id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written
    Inserted,
    /// A row with the same key already existed; nothing was written
    AlreadyExists,
}

/// Result of a compare-and-swap claim on a pending request
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// This caller won; the request as stored after the claim
    Claimed(WasteRequest),
    /// The request was not pending and unclaimed when the write ran
    AlreadyClaimed,
}

/// Which party's column a conditional transition is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestActor {
    /// Must match `dumper_id`
    Dumper,
    /// Must match `collector_id`
    Collector,
}

impl RequestActor {
    /// Column holding this party's profile id
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Dumper => "dumper_id",
            Self::Collector => "collector_id",
        }
    }
}

/// Core storage abstraction
///
/// "Not found" is always an `Ok(None)` (or a distinguished outcome), never an
/// error. Errors are reserved for the store itself failing.
#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    /// Create tables and indexes if they do not exist
    async fn migrate(&self) -> AppResult<()>;

    // ================================
    // Profiles
    // ================================

    /// Fetch a profile by identity id
    async fn get_profile(&self, id: &str) -> AppResult<Option<UserProfile>>;

    /// Insert a profile; a duplicate id yields `AlreadyExists`
    async fn insert_profile(&self, profile: &UserProfile) -> AppResult<InsertOutcome>;

    /// Overwrite the mutable columns of an existing profile
    ///
    /// Returns the stored row, or `None` if no row has this id.
    async fn update_profile(&self, profile: &UserProfile) -> AppResult<Option<UserProfile>>;

    /// Record the last known position of a user; returns whether a row was touched
    async fn update_profile_location(
        &self,
        id: &str,
        location: Coordinates,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    // ================================
    // Pending intents
    // ================================

    /// Store (or replace) the intent recorded under `key`
    async fn store_pending_intent(
        &self,
        key: &str,
        intent: PendingIntent,
        created_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Read and delete the intent under `key`; rows created before `not_before` are discarded
    async fn take_pending_intent(
        &self,
        key: &str,
        not_before: DateTime<Utc>,
    ) -> AppResult<Option<PendingIntent>>;

    /// Delete intents created before `older_than`; returns the number removed
    async fn purge_pending_intents(&self, older_than: DateTime<Utc>) -> AppResult<u64>;

    // ================================
    // Pickup requests
    // ================================

    /// Insert a new request
    async fn create_request(&self, request: &WasteRequest) -> AppResult<()>;

    /// Fetch a request by id
    async fn get_request(&self, id: Uuid) -> AppResult<Option<WasteRequest>>;

    /// List requests, newest first, optionally restricted to one status
    async fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<WasteRequest>>;

    /// Assign a collector iff the request is still `pending` with no collector
    async fn claim_request(
        &self,
        id: Uuid,
        collector_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ClaimOutcome>;

    /// Move a request from `from` to `to` iff it is in `from` and `actor_id` holds the actor column
    ///
    /// Returns the updated request, or `None` when the precondition did not hold.
    async fn transition_request(
        &self,
        id: Uuid,
        actor: RequestActor,
        actor_id: &str,
        from: RequestStatus,
        to: RequestStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<WasteRequest>>;
}
