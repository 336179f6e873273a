// ABOUTME: Integration tests for the phone verification gate
// ABOUTME: Covers resend cooldown, failed sends, wrong codes, and persisting verified phones
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 WasteLink

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use common::{create_test_server, test_identity, GOOD_CODE};
use wastelink_server::{
    database_plugins::DatabaseProvider,
    errors::ErrorCode,
    models::UserType,
    verification::{requires_verification, VerificationStatus},
};

const PHONE: &str = "+15550001111";

#[tokio::test]
async fn test_send_moves_to_sent_and_starts_cooldown() -> Result<()> {
    let server = create_test_server().await?;
    let gate = &server.resources.verification;

    gate.send_phone_verification("sub-1", PHONE).await?;

    let snapshot = gate.snapshot("sub-1");
    assert_eq!(snapshot.status, VerificationStatus::Sent);
    assert!(snapshot.state.phone_sent);
    assert!(!snapshot.state.is_verifying);
    assert!(snapshot.resend_available_in_secs > 0);
    assert_eq!(server.messaging.sent_to(), vec![PHONE.to_owned()]);
    Ok(())
}

#[tokio::test]
async fn test_resend_during_cooldown_is_rate_limited() -> Result<()> {
    let server = create_test_server().await?;
    let gate = &server.resources.verification;

    gate.send_phone_verification("sub-1", PHONE).await?;
    let err = gate
        .send_phone_verification("sub-1", PHONE)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::RateLimitExceeded);
    assert_eq!(server.messaging.sent_to().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_resend_allowed_after_cooldown() -> Result<()> {
    let server = create_test_server().await?;
    let gate = &server.resources.verification;
    tokio::time::pause();

    gate.send_phone_verification("sub-1", PHONE).await?;
    tokio::time::advance(Duration::from_secs(61)).await;
    gate.send_phone_verification("sub-1", PHONE).await?;

    assert_eq!(server.messaging.sent_to().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_send_records_error_without_reaching_sent() -> Result<()> {
    let server = create_test_server().await?;
    let gate = &server.resources.verification;
    server.messaging.set_fail_sends(true);

    let err = gate
        .send_phone_verification("sub-1", PHONE)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalServiceError);

    let snapshot = gate.snapshot("sub-1");
    assert_eq!(snapshot.status, VerificationStatus::Error);
    assert!(!snapshot.state.phone_sent);
    assert!(!snapshot.state.is_verifying);

    // No cooldown was started, so a retry goes straight through
    server.messaging.set_fail_sends(false);
    gate.send_phone_verification("sub-1", PHONE).await?;
    assert_eq!(gate.snapshot("sub-1").status, VerificationStatus::Sent);
    Ok(())
}

#[tokio::test]
async fn test_verify_before_send_is_rejected() -> Result<()> {
    let server = create_test_server().await?;
    let err = server
        .resources
        .verification
        .verify_phone_code(&test_identity("sub-1", "a@example.com"), GOOD_CODE)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    Ok(())
}

#[tokio::test]
async fn test_malformed_code_never_reaches_service() -> Result<()> {
    let server = create_test_server().await?;
    let gate = &server.resources.verification;
    let identity = test_identity("sub-1", "a@example.com");
    gate.send_phone_verification("sub-1", PHONE).await?;

    for code in ["12345", "1234567", "12a456", ""] {
        let err = gate.verify_phone_code(&identity, code).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "code {code:?}");
    }
    assert_eq!(server.messaging.checks.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_wrong_code_stays_sent() -> Result<()> {
    let server = create_test_server().await?;
    let gate = &server.resources.verification;
    let identity = test_identity("sub-1", "a@example.com");
    gate.send_phone_verification("sub-1", PHONE).await?;

    let err = gate.verify_phone_code(&identity, "000000").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let snapshot = gate.snapshot("sub-1");
    assert!(snapshot.state.phone_sent);
    assert!(!snapshot.state.phone_verified);
    assert!(!snapshot.state.is_verifying);
    assert!(snapshot.state.error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_correct_code_persists_verified_phone() -> Result<()> {
    let server = create_test_server().await?;
    let (mut profile, _) = server.create_user("sub-1", UserType::Dumper).await?;
    profile.phone = Some(PHONE.to_owned());
    server.database.update_profile(&profile).await?;
    assert!(requires_verification(&profile));

    let gate = &server.resources.verification;
    let identity = test_identity("sub-1", "sub-1@example.com");
    gate.send_phone_verification("sub-1", PHONE).await?;
    let verified = gate.verify_phone_code(&identity, GOOD_CODE).await?;

    assert!(verified.phone_verified);
    assert_eq!(verified.phone.as_deref(), Some(PHONE));
    assert!(!requires_verification(&verified));
    assert_eq!(gate.snapshot("sub-1").status, VerificationStatus::Verified);

    let stored = server.database.get_profile("sub-1").await?.unwrap();
    assert!(stored.phone_verified);
    Ok(())
}

#[tokio::test]
async fn test_reset_forgets_progress() -> Result<()> {
    let server = create_test_server().await?;
    let gate = &server.resources.verification;
    gate.send_phone_verification("sub-1", PHONE).await?;

    gate.reset("sub-1");

    let snapshot = gate.snapshot("sub-1");
    assert_eq!(snapshot.status, VerificationStatus::Unverified);
    assert_eq!(snapshot.resend_available_in_secs, 0);
    Ok(())
}
