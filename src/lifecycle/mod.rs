// ABOUTME: Pickup request lifecycle with race-safe claiming and party-checked transitions
// ABOUTME: Creation, listing, accept (compare-and-swap), advance, and cancel over the shared pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

//! # Request Lifecycle
//!
//! `pending → matched → in_progress → completed`, with `cancelled` reachable
//! from `pending` only. Every write is conditioned on the state it expects,
//! so concurrent callers are arbitrated by the store, not by local locks.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use wastelink_core::errors::{AppError, AppResult};
use wastelink_core::models::{
    Coordinates, NewWasteRequest, RequestStatus, UserProfile, WasteRequest,
};

use crate::database_plugins::{ClaimOutcome, DatabaseProvider, RequestActor};
use crate::matching::{self, NearbyRequest};

/// Request operations for dumpers and collectors
pub struct RequestLifecycle {
    database: Arc<dyn DatabaseProvider>,
    radius_km: f64,
}

impl RequestLifecycle {
    /// Create a lifecycle over `database`, matching within `radius_km`
    #[must_use]
    pub fn new(database: Arc<dyn DatabaseProvider>, radius_km: f64) -> Self {
        Self {
            database,
            radius_km,
        }
    }

    /// Admission radius used for available work
    #[must_use]
    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }

    async fn load(&self, id: Uuid) -> AppResult<WasteRequest> {
        self.database
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Request {id}")))
    }

    /// Create a pending request owned by `dumper`
    ///
    /// # Errors
    ///
    /// Returns `PERMISSION_DENIED` for collectors, `INVALID_INPUT` for bad
    /// fields, or a store error
    pub async fn create(
        &self,
        dumper: &UserProfile,
        input: NewWasteRequest,
    ) -> AppResult<WasteRequest> {
        if dumper.is_collector() {
            return Err(AppError::permission_denied(
                "Only dumpers can create pickup requests",
            ));
        }
        input.validate()?;

        let now = Utc::now();
        let request = WasteRequest {
            id: Uuid::new_v4(),
            dumper_id: dumper.id.clone(),
            collector_id: None,
            waste_type: input.waste_type,
            description: input
                .description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
            location: input.location,
            address: input.address.trim().to_owned(),
            status: RequestStatus::Pending,
            scheduled_time: input.scheduled_time,
            estimated_amount: input.estimated_amount,
            photos: input
                .photos
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect(),
            created_at: now,
            updated_at: now,
        };

        self.database.create_request(&request).await?;
        info!(request_id = %request.id, dumper_id = %dumper.id, waste_type = request.waste_type.as_str(), "Pickup request created");
        Ok(request)
    }

    /// Fetch one request visible to `user`
    ///
    /// Pending requests are visible to everyone; otherwise only to the
    /// dumper and the assigned collector.
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` or `PERMISSION_DENIED`
    pub async fn get(&self, user_id: &str, id: Uuid) -> AppResult<WasteRequest> {
        let request = self.load(id).await?;
        if request.status == RequestStatus::Pending || request.involves(user_id) {
            Ok(request)
        } else {
            Err(AppError::permission_denied(
                "This request belongs to other users",
            ))
        }
    }

    /// Nearby claimable work for a collector
    ///
    /// # Errors
    ///
    /// Returns `PERMISSION_DENIED` for dumpers or a store error
    pub async fn available_for(
        &self,
        collector: &UserProfile,
        here: Option<Coordinates>,
    ) -> AppResult<Vec<NearbyRequest>> {
        if !collector.is_collector() {
            return Err(AppError::permission_denied(
                "Only collectors can browse available requests",
            ));
        }
        if here.is_none() {
            debug!(user_id = %collector.id, "No known position; no available requests");
            return Ok(Vec::new());
        }

        let pool = self
            .database
            .list_requests(Some(RequestStatus::Pending))
            .await?;
        Ok(matching::available_requests(
            &pool,
            &collector.id,
            here,
            self.radius_km,
        ))
    }

    /// Every request the user created or holds
    ///
    /// # Errors
    ///
    /// Returns a store error
    pub async fn mine(&self, user_id: &str) -> AppResult<Vec<WasteRequest>> {
        let pool = self.database.list_requests(None).await?;
        Ok(matching::my_requests(&pool, user_id))
    }

    /// Claim a pending request
    ///
    /// Losing a race to another collector is reported as
    /// [`ClaimOutcome::AlreadyClaimed`], not as an error. Accepting a
    /// request the caller already holds in `matched` returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `PERMISSION_DENIED` for dumpers or for claiming one's own
    /// request, `INVALID_STATE_TRANSITION` when the caller already holds it
    /// past `matched`, `RESOURCE_NOT_FOUND`, or a store error
    pub async fn accept(&self, id: Uuid, collector: &UserProfile) -> AppResult<ClaimOutcome> {
        if !collector.is_collector() {
            return Err(AppError::permission_denied(
                "Only collectors can accept requests",
            ));
        }

        let current = self.load(id).await?;
        if current.dumper_id == collector.id {
            return Err(AppError::permission_denied(
                "You cannot accept your own request",
            ));
        }
        if current.collector_id.as_deref() == Some(collector.id.as_str()) {
            return Self::already_held(current);
        }
        if current.status != RequestStatus::Pending || current.collector_id.is_some() {
            debug!(request_id = %id, status = %current.status, "Accept on a request that is no longer open");
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        let outcome = self
            .database
            .claim_request(id, &collector.id, Utc::now())
            .await?;
        match &outcome {
            ClaimOutcome::Claimed(_) => {
                info!(request_id = %id, collector_id = %collector.id, "Request claimed");
            }
            ClaimOutcome::AlreadyClaimed => {
                // A duplicate accept from the same collector can lose to itself
                let current = self.load(id).await?;
                if current.collector_id.as_deref() == Some(collector.id.as_str()) {
                    return Self::already_held(current);
                }
                info!(request_id = %id, collector_id = %collector.id, "Lost claim race");
            }
        }
        Ok(outcome)
    }

    /// Repeat accept by the holder: a matched request is returned unchanged,
    /// anything further along is a state error
    fn already_held(current: WasteRequest) -> AppResult<ClaimOutcome> {
        if current.status == RequestStatus::Matched {
            debug!(request_id = %current.id, "Repeat accept by the holding collector");
            return Ok(ClaimOutcome::Claimed(current));
        }
        Err(AppError::invalid_transition(format!(
            "You already accepted this request and it is now {}",
            current.status
        )))
    }

    /// Move a held request one step forward
    ///
    /// Only `matched → in_progress` and `in_progress → completed` are
    /// allowed, and only by the collector holding the request.
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `PERMISSION_DENIED` for anyone but the
    /// holder, `INVALID_STATE_TRANSITION` for any other move, or a store error
    pub async fn advance(
        &self,
        id: Uuid,
        collector_id: &str,
        next: RequestStatus,
    ) -> AppResult<WasteRequest> {
        let current = self.load(id).await?;
        if current.collector_id.as_deref() != Some(collector_id) {
            return Err(AppError::permission_denied(
                "Only the collector holding this request can update it",
            ));
        }
        if current.status.collector_successor() != Some(next) {
            return Err(AppError::invalid_transition(format!(
                "Cannot move a request from {} to {next}",
                current.status
            )));
        }

        let updated = self
            .database
            .transition_request(
                id,
                RequestActor::Collector,
                collector_id,
                current.status,
                next,
                Utc::now(),
            )
            .await?
            .ok_or_else(|| {
                AppError::invalid_transition(format!(
                    "Request is no longer {}; reload and try again",
                    current.status
                ))
            })?;

        info!(request_id = %id, from = %current.status, to = %next, "Request advanced");
        Ok(updated)
    }

    /// Withdraw an unclaimed request
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `PERMISSION_DENIED` for anyone but the
    /// dumper, `INVALID_STATE_TRANSITION` once it has left `pending`, or a
    /// store error
    pub async fn cancel(&self, id: Uuid, dumper_id: &str) -> AppResult<WasteRequest> {
        let current = self.load(id).await?;
        if current.dumper_id != dumper_id {
            return Err(AppError::permission_denied(
                "Only the dumper who created this request can cancel it",
            ));
        }
        if current.status != RequestStatus::Pending {
            return Err(AppError::invalid_transition(format!(
                "Cannot cancel a request that is {}",
                current.status
            )));
        }

        let cancelled = self
            .database
            .transition_request(
                id,
                RequestActor::Dumper,
                dumper_id,
                RequestStatus::Pending,
                RequestStatus::Cancelled,
                Utc::now(),
            )
            .await?
            .ok_or_else(|| {
                AppError::invalid_transition("Request was claimed before it could be cancelled")
            })?;

        info!(request_id = %id, "Request cancelled");
        Ok(cancelled)
    }
}
