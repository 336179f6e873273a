// ABOUTME: Phone verification gate deciding whether a signed-in user must verify before proceeding
// ABOUTME: Per-user verification state machine with send cooldown and code checking
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

//! # Verification Gate
//!
//! A user with a phone number on file that has not been verified is routed
//! to verification before reaching a dashboard. Nothing else gates routing.
//!
//! Each signed-in user gets one [`VerificationState`]. It moves
//! `unverified → sent → verifying → verified`, and a failed send or check
//! records an error without losing the `sent` progress.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};
use wastelink_core::constants::verification::{CODE_LENGTH, RESEND_COOLDOWN_SECS};
use wastelink_core::errors::{AppError, AppResult};
use wastelink_core::models::{ProfileUpdate, UserProfile};

use crate::identity::{ExternalIdentity, IdentityResolver};

/// Messaging capability used to deliver and check codes
pub mod messaging;

pub use messaging::{CodeCheck, HttpMessagingProvider, MessagingProvider};

/// Whether the caller must complete phone verification first
#[must_use]
pub fn requires_verification(profile: &UserProfile) -> bool {
    profile.has_phone() && !profile.phone_verified
}

/// Coarse position in the verification flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Nothing sent yet
    Unverified,
    /// A code is out; waiting for the user to enter it
    Sent,
    /// A send or check is in flight
    Verifying,
    /// The phone is verified
    Verified,
    /// The last send or check failed
    Error,
}

/// Verification progress for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationState {
    /// A code was delivered
    pub phone_sent: bool,
    /// The phone completed verification
    pub phone_verified: bool,
    /// A send or check is in flight
    pub is_verifying: bool,
    /// Reason the last operation failed
    pub error: Option<String>,
}

impl VerificationState {
    /// Collapse the flags into a single status
    #[must_use]
    pub const fn status(&self) -> VerificationStatus {
        if self.phone_verified {
            VerificationStatus::Verified
        } else if self.is_verifying {
            VerificationStatus::Verifying
        } else if self.error.is_some() {
            VerificationStatus::Error
        } else if self.phone_sent {
            VerificationStatus::Sent
        } else {
            VerificationStatus::Unverified
        }
    }
}

/// State plus the bookkeeping the gate needs between calls
#[derive(Debug, Default)]
struct Entry {
    state: VerificationState,
    sent_to: Option<String>,
    resend_at: Option<Instant>,
}

/// Clears the in-flight flag even if the calling future is dropped mid-call
struct InFlight<'a> {
    states: &'a DashMap<String, Entry>,
    user_id: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(mut entry) = self.states.get_mut(self.user_id) {
            entry.state.is_verifying = false;
        }
    }
}

/// Point-in-time view of a user's verification progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSnapshot {
    /// Coarse status
    pub status: VerificationStatus,
    /// Underlying flags
    #[serde(flatten)]
    pub state: VerificationState,
    /// Seconds until another code may be sent
    pub resend_available_in_secs: u64,
}

/// Owns every user's verification state
pub struct VerificationGate {
    states: DashMap<String, Entry>,
    messaging: Arc<dyn MessagingProvider>,
    resolver: Arc<IdentityResolver>,
    cooldown: Duration,
}

impl VerificationGate {
    /// Create a gate using the standard resend cooldown
    #[must_use]
    pub fn new(messaging: Arc<dyn MessagingProvider>, resolver: Arc<IdentityResolver>) -> Self {
        Self {
            states: DashMap::new(),
            messaging,
            resolver,
            cooldown: Duration::from_secs(RESEND_COOLDOWN_SECS),
        }
    }

    /// Current state for a user
    #[must_use]
    pub fn snapshot(&self, user_id: &str) -> VerificationSnapshot {
        let now = Instant::now();
        self.states.get(user_id).map_or_else(
            || VerificationSnapshot {
                status: VerificationStatus::Unverified,
                state: VerificationState::default(),
                resend_available_in_secs: 0,
            },
            |entry| VerificationSnapshot {
                status: entry.state.status(),
                state: entry.state.clone(),
                resend_available_in_secs: entry
                    .resend_at
                    .map_or(0, |at| at.saturating_duration_since(now).as_secs()),
            },
        )
    }

    /// Send a one-time code to `phone`
    ///
    /// The user is marked verifying before the messaging call so a second
    /// send cannot start; on success the resend cooldown begins.
    ///
    /// # Errors
    ///
    /// - `INVALID_INPUT` for a blank phone
    /// - `RATE_LIMIT_EXCEEDED` while a send or check is in flight or during the cooldown
    /// - the messaging failure, which is also recorded in the state
    pub async fn send_phone_verification(&self, user_id: &str, phone: &str) -> AppResult<()> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(AppError::invalid_input("Phone number is required"));
        }

        {
            let mut entry = self.states.entry(user_id.to_owned()).or_default();
            if entry.state.is_verifying {
                return Err(AppError::rate_limited("A verification is already in progress"));
            }
            if let Some(at) = entry.resend_at {
                let remaining = at.saturating_duration_since(Instant::now());
                if !remaining.is_zero() {
                    return Err(AppError::rate_limited(format!(
                        "Please wait {}s before requesting another code",
                        remaining.as_secs().max(1)
                    )));
                }
            }
            entry.state.is_verifying = true;
            entry.state.error = None;
        }

        let in_flight = InFlight {
            states: &self.states,
            user_id,
        };
        let result = self.messaging.send(phone).await;
        drop(in_flight);

        let mut entry = self.states.entry(user_id.to_owned()).or_default();
        match result {
            Ok(()) => {
                entry.state.phone_sent = true;
                entry.state.phone_verified = false;
                entry.sent_to = Some(phone.to_owned());
                entry.resend_at = Some(Instant::now() + self.cooldown);
                drop(entry);
                info!(user_id = %user_id, "Verification code sent");
                Ok(())
            }
            Err(e) => {
                entry.state.error = Some(e.message.clone());
                drop(entry);
                warn!(user_id = %user_id, error = %e, "Verification code send failed");
                Err(e)
            }
        }
    }

    /// Check a code and, on success, mark the phone verified on the profile
    ///
    /// # Errors
    ///
    /// - `INVALID_INPUT` unless the code is exactly six digits, or when the code is wrong
    /// - `INVALID_STATE_TRANSITION` if no code was sent
    /// - `RATE_LIMIT_EXCEEDED` while another operation is in flight
    /// - messaging or profile write failures
    pub async fn verify_phone_code(
        &self,
        identity: &ExternalIdentity,
        code: &str,
    ) -> AppResult<UserProfile> {
        let code = code.trim();
        if code.len() != CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::invalid_input(format!(
                "Verification code must be exactly {CODE_LENGTH} digits"
            )));
        }

        let phone = {
            let mut entry = self.states.entry(identity.id.clone()).or_default();
            if entry.state.is_verifying {
                return Err(AppError::rate_limited("A verification is already in progress"));
            }
            let Some(phone) = entry.sent_to.clone().filter(|_| entry.state.phone_sent) else {
                return Err(AppError::invalid_transition(
                    "No verification code has been sent",
                ));
            };
            entry.state.is_verifying = true;
            entry.state.error = None;
            phone
        };

        let in_flight = InFlight {
            states: &self.states,
            user_id: &identity.id,
        };
        let outcome = self.check_and_persist(identity, &phone, code).await;
        drop(in_flight);

        let mut entry = self.states.entry(identity.id.clone()).or_default();
        match outcome {
            Ok(profile) => {
                entry.state.phone_verified = true;
                drop(entry);
                info!(user_id = %identity.id, "Phone verified");
                Ok(profile)
            }
            Err(e) => {
                entry.state.error = Some(e.message.clone());
                drop(entry);
                warn!(user_id = %identity.id, error = %e, "Phone verification failed");
                Err(e)
            }
        }
    }

    async fn check_and_persist(
        &self,
        identity: &ExternalIdentity,
        phone: &str,
        code: &str,
    ) -> AppResult<UserProfile> {
        match self.messaging.verify_code(phone, code).await? {
            CodeCheck::Approved => {
                let update = ProfileUpdate {
                    phone: Some(phone.to_owned()),
                    phone_verified: Some(true),
                    ..ProfileUpdate::default()
                };
                self.resolver.update_profile(identity, &update).await
            }
            CodeCheck::Rejected => Err(AppError::invalid_input("Verification code is incorrect")),
        }
    }

    /// Forget a user's progress
    pub fn reset(&self, user_id: &str) {
        self.states.remove(user_id);
    }
}
