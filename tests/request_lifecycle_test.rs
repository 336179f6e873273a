// ABOUTME: Integration tests for the pickup request lifecycle over the SQLite store
// ABOUTME: Covers creation rules, radius matching, claim races, transitions, and cancellation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 WasteLink

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use anyhow::Result;
use common::{create_test_server, new_request, test_profile, TestServer};
use wastelink_server::{
    database_plugins::ClaimOutcome,
    errors::ErrorCode,
    models::{Coordinates, RequestStatus, UserProfile, UserType, WasteRequest},
};

const COLLECTOR_AT: Coordinates = Coordinates::new(40.7128, -74.0060);
// About 1.1 km north of the collector
const NEAR: Coordinates = Coordinates::new(40.7228, -74.0060);
// About 8 km north of the collector
const FAR: Coordinates = Coordinates::new(40.7848, -74.0060);

struct Parties {
    server: TestServer,
    dumper: UserProfile,
    collector: UserProfile,
    rival: UserProfile,
}

async fn parties() -> Result<Parties> {
    let server = create_test_server().await?;
    let (dumper, _) = server.create_user("dumper-1", UserType::Dumper).await?;
    let (collector, _) = server.create_user("collector-1", UserType::Collector).await?;
    let (rival, _) = server.create_user("collector-2", UserType::Collector).await?;
    Ok(Parties {
        server,
        dumper,
        collector,
        rival,
    })
}

async fn pending(p: &Parties, at: Coordinates) -> Result<WasteRequest> {
    Ok(p.server
        .resources
        .requests
        .create(&p.dumper, new_request(at))
        .await?)
}

async fn matched(p: &Parties) -> Result<WasteRequest> {
    let request = pending(p, NEAR).await?;
    matched_from(p, &request).await
}

async fn matched_from(p: &Parties, request: &WasteRequest) -> Result<WasteRequest> {
    match p
        .server
        .resources
        .requests
        .accept(request.id, &p.collector)
        .await?
    {
        ClaimOutcome::Claimed(claimed) => Ok(claimed),
        ClaimOutcome::AlreadyClaimed => panic!("fresh request should be claimable"),
    }
}

#[tokio::test]
async fn test_create_starts_pending_without_collector() -> Result<()> {
    let p = parties().await?;
    let request = pending(&p, NEAR).await?;

    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.collector_id.is_none());
    assert_eq!(request.dumper_id, p.dumper.id);
    Ok(())
}

#[tokio::test]
async fn test_collectors_cannot_create_requests() -> Result<()> {
    let p = parties().await?;
    let err = p
        .server
        .resources
        .requests
        .create(&p.collector, new_request(NEAR))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_blank_address() -> Result<()> {
    let p = parties().await?;
    let mut input = new_request(NEAR);
    input.address = "  ".to_owned();
    let err = p
        .server
        .resources
        .requests
        .create(&p.dumper, input)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    Ok(())
}

#[tokio::test]
async fn test_available_filters_by_radius_and_sorts_nearest_first() -> Result<()> {
    let p = parties().await?;
    let near = pending(&p, NEAR).await?;
    let _far = pending(&p, FAR).await?;
    let nearer = pending(&p, COLLECTOR_AT).await?;

    let available = p
        .server
        .resources
        .requests
        .available_for(&p.collector, Some(COLLECTOR_AT))
        .await?;

    let ids: Vec<_> = available.iter().map(|n| n.request.id).collect();
    assert_eq!(ids, vec![nearer.id, near.id]);
    assert!(available.iter().all(|n| n.distance_km <= 4.0));
    Ok(())
}

#[tokio::test]
async fn test_available_is_empty_without_position() -> Result<()> {
    let p = parties().await?;
    pending(&p, NEAR).await?;

    let available = p
        .server
        .resources
        .requests
        .available_for(&p.collector, None)
        .await?;
    assert!(available.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_claimed_requests_leave_the_available_pool() -> Result<()> {
    let p = parties().await?;
    matched(&p).await?;

    let available = p
        .server
        .resources
        .requests
        .available_for(&p.rival, Some(COLLECTOR_AT))
        .await?;
    assert!(available.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_accepts_have_exactly_one_winner() -> Result<()> {
    let p = parties().await?;
    let request = pending(&p, NEAR).await?;
    let requests = &p.server.resources.requests;

    let (first, second) = tokio::join!(
        requests.accept(request.id, &p.collector),
        requests.accept(request.id, &p.rival),
    );
    let outcomes = [first?, second?];

    let winners: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            ClaimOutcome::Claimed(r) => Some(r.collector_id.clone()),
            ClaimOutcome::AlreadyClaimed => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);

    let stored = requests.get(&p.dumper.id, request.id).await?;
    assert_eq!(stored.status, RequestStatus::Matched);
    assert_eq!(stored.collector_id, winners[0]);
    Ok(())
}

#[tokio::test]
async fn test_accept_on_claimed_request_reports_already_claimed() -> Result<()> {
    let p = parties().await?;
    let request = matched(&p).await?;

    let outcome = p
        .server
        .resources
        .requests
        .accept(request.id, &p.rival)
        .await?;
    assert_eq!(outcome, ClaimOutcome::AlreadyClaimed);
    Ok(())
}

#[tokio::test]
async fn test_repeat_accept_by_holder_returns_request_unchanged() -> Result<()> {
    let p = parties().await?;
    let request = matched(&p).await?;
    let requests = &p.server.resources.requests;

    let again = requests.accept(request.id, &p.collector).await?;
    assert_eq!(again, ClaimOutcome::Claimed(request.clone()));

    requests
        .advance(request.id, &p.collector.id, RequestStatus::InProgress)
        .await?;
    let err = requests
        .accept(request.id, &p.collector)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    assert!(err.message.contains("already accepted"));
    Ok(())
}

#[tokio::test]
async fn test_dumpers_cannot_accept() -> Result<()> {
    let p = parties().await?;
    let request = pending(&p, NEAR).await?;
    let other_dumper = test_profile("dumper-2", UserType::Dumper);

    let err = p
        .server
        .resources
        .requests
        .accept(request.id, &other_dumper)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    Ok(())
}

#[tokio::test]
async fn test_advance_walks_forward_one_step_at_a_time() -> Result<()> {
    let p = parties().await?;
    let request = matched(&p).await?;
    let requests = &p.server.resources.requests;

    let skipped = requests
        .advance(request.id, &p.collector.id, RequestStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(skipped.code, ErrorCode::InvalidStateTransition);

    let started = requests
        .advance(request.id, &p.collector.id, RequestStatus::InProgress)
        .await?;
    assert_eq!(started.status, RequestStatus::InProgress);

    let done = requests
        .advance(request.id, &p.collector.id, RequestStatus::Completed)
        .await?;
    assert_eq!(done.status, RequestStatus::Completed);
    assert_eq!(done.collector_id.as_deref(), Some(p.collector.id.as_str()));

    let backwards = requests
        .advance(request.id, &p.collector.id, RequestStatus::InProgress)
        .await
        .unwrap_err();
    assert_eq!(backwards.code, ErrorCode::InvalidStateTransition);
    Ok(())
}

#[tokio::test]
async fn test_only_holder_can_advance() -> Result<()> {
    let p = parties().await?;
    let request = matched(&p).await?;

    let err = p
        .server
        .resources
        .requests
        .advance(request.id, &p.rival.id, RequestStatus::InProgress)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    Ok(())
}

#[tokio::test]
async fn test_cancel_only_from_pending_by_owner() -> Result<()> {
    let p = parties().await?;
    let requests = &p.server.resources.requests;

    let open = pending(&p, NEAR).await?;
    let not_owner = requests.cancel(open.id, &p.collector.id).await.unwrap_err();
    assert_eq!(not_owner.code, ErrorCode::PermissionDenied);

    let cancelled = requests.cancel(open.id, &p.dumper.id).await?;
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert!(cancelled.collector_id.is_none());

    let claimed = matched(&p).await?;
    let too_late = requests.cancel(claimed.id, &p.dumper.id).await.unwrap_err();
    assert_eq!(too_late.code, ErrorCode::InvalidStateTransition);
    Ok(())
}

#[tokio::test]
async fn test_visibility_of_claimed_requests() -> Result<()> {
    let p = parties().await?;
    let request = matched(&p).await?;
    let requests = &p.server.resources.requests;

    assert!(requests.get(&p.dumper.id, request.id).await.is_ok());
    assert!(requests.get(&p.collector.id, request.id).await.is_ok());
    let err = requests.get(&p.rival.id, request.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    Ok(())
}

#[tokio::test]
async fn test_mine_lists_created_and_held_requests() -> Result<()> {
    let p = parties().await?;
    let held = matched(&p).await?;
    let _open = pending(&p, FAR).await?;
    let requests = &p.server.resources.requests;

    assert_eq!(requests.mine(&p.dumper.id).await?.len(), 2);
    let collector_view = requests.mine(&p.collector.id).await?;
    assert_eq!(collector_view.len(), 1);
    assert_eq!(collector_view[0].id, held.id);
    assert!(requests.mine(&p.rival.id).await?.is_empty());
    Ok(())
}

// Real sleeps: timestamps come from the wall clock through SQLite
const TICK: Duration = Duration::from_millis(5);

#[tokio::test]
async fn test_accept_and_advance_bump_updated_at() -> Result<()> {
    let p = parties().await?;
    let requests = &p.server.resources.requests;
    let open = pending(&p, NEAR).await?;

    tokio::time::sleep(TICK).await;
    let claimed = matched_from(&p, &open).await?;
    assert!(claimed.updated_at > open.updated_at);
    assert_eq!(claimed.created_at, open.created_at);

    tokio::time::sleep(TICK).await;
    let started = requests
        .advance(open.id, &p.collector.id, RequestStatus::InProgress)
        .await?;
    assert!(started.updated_at > claimed.updated_at);

    tokio::time::sleep(TICK).await;
    let done = requests
        .advance(open.id, &p.collector.id, RequestStatus::Completed)
        .await?;
    assert!(done.updated_at > started.updated_at);

    let stored = requests.get(&p.dumper.id, open.id).await?;
    assert_eq!(stored.updated_at, done.updated_at);
    Ok(())
}

#[tokio::test]
async fn test_cancel_bumps_updated_at() -> Result<()> {
    let p = parties().await?;
    let requests = &p.server.resources.requests;
    let open = pending(&p, NEAR).await?;

    tokio::time::sleep(TICK).await;
    let cancelled = requests.cancel(open.id, &p.dumper.id).await?;
    assert!(cancelled.updated_at > open.updated_at);

    let stored = requests.get(&p.dumper.id, open.id).await?;
    assert_eq!(stored.updated_at, cancelled.updated_at);
    Ok(())
}
