// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides the in-memory store, fake external services, and fault-injecting wrappers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 WasteLink
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `wastelink_server`

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use wastelink_server::{
    auth::SessionManager,
    cache::{Cache, CacheConfig, CacheProvider},
    config::{
        CorsConfig, DatabaseConfig, DatabaseUrl, Environment, IdentityProviderConfig, LogLevel,
        MatchingConfig, MessagingConfig, ResolverConfig, ServerConfig, SessionConfig,
    },
    context::ServerResources,
    database_plugins::{
        ClaimOutcome, DatabaseProvider, InsertOutcome, RequestActor, SqliteDatabase,
    },
    errors::{AppError, AppResult},
    identity::{ExternalIdentity, IdentityProvider, SessionMetadata},
    models::{
        Coordinates, NewWasteRequest, PendingIntent, RequestStatus, UserProfile, UserType,
        WasteRequest, WasteType,
    },
    verification::{CodeCheck, MessagingProvider},
};

static INIT_LOGGER: Once = Once::new();

/// Code the fake messaging service accepts
pub const GOOD_CODE: &str = "123456";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Arc<SqliteDatabase>> {
    init_test_logging();
    Ok(Arc::new(SqliteDatabase::in_memory().await?))
}

/// Cache without the background sweep
pub async fn create_test_cache() -> Cache {
    Cache::new(CacheConfig {
        enable_background_cleanup: false,
        ..Default::default()
    })
    .await
}

/// Configuration suitable for tests
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        log_level: LogLevel::Warn,
        environment: Environment::Testing,
        database: DatabaseConfig {
            url: DatabaseUrl::Memory,
        },
        identity_provider: IdentityProviderConfig::default(),
        messaging: MessagingConfig::default(),
        session: SessionConfig {
            jwt_secret: "test-session-secret-with-enough-entropy".to_owned(),
            expiry_hours: 1,
        },
        matching: MatchingConfig::default(),
        resolver: ResolverConfig {
            profile_fetch_timeout: Duration::from_millis(200),
        },
        cache: CacheConfig {
            enable_background_cleanup: false,
            ..Default::default()
        },
        cors: CorsConfig::default(),
    }
}

/// Identity with display metadata
pub fn test_identity(id: &str, email: &str) -> ExternalIdentity {
    ExternalIdentity {
        id: id.to_owned(),
        email: email.to_owned(),
        email_verified: true,
        metadata: SessionMetadata::default(),
    }
}

/// A stored profile for `id`
pub fn test_profile(id: &str, user_type: UserType) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        id: id.to_owned(),
        email: format!("{id}@example.com"),
        full_name: format!("User {id}"),
        user_type,
        phone: None,
        address: None,
        email_verified: true,
        phone_verified: false,
        created_at: now,
        updated_at: now,
    }
}

/// A valid request body at `location`
pub fn new_request(location: Coordinates) -> NewWasteRequest {
    NewWasteRequest {
        waste_type: WasteType::Recyclable,
        description: Some("Two bags of bottles".to_owned()),
        location,
        address: "12 Test Street".to_owned(),
        scheduled_time: None,
        estimated_amount: Some(5.0),
        photos: Vec::new(),
    }
}

// ============================================================================
// Fake identity provider
// ============================================================================

/// Identity provider that maps authorization codes to canned identities
#[derive(Default)]
pub struct FakeIdentityProvider {
    identities: Mutex<HashMap<String, ExternalIdentity>>,
}

impl FakeIdentityProvider {
    /// Make `code` complete as `identity`
    pub fn register(&self, code: &str, identity: ExternalIdentity) {
        self.identities
            .lock()
            .unwrap()
            .insert(code.to_owned(), identity);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn authorization_url(&self, state: &str) -> AppResult<String> {
        Ok(format!("https://id.example.test/authorize?state={state}"))
    }

    async fn complete_sign_in(&self, code: &str) -> AppResult<ExternalIdentity> {
        self.identities
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| AppError::auth_invalid("Unknown authorization code"))
    }
}

// ============================================================================
// Fake messaging service
// ============================================================================

/// Messaging service that records sends and accepts [`GOOD_CODE`]
#[derive(Default)]
pub struct FakeMessaging {
    /// Numbers a code was sent to
    pub sent: Mutex<Vec<String>>,
    /// Number of code checks performed
    pub checks: AtomicUsize,
    /// Make every send fail
    pub fail_sends: AtomicBool,
}

impl FakeMessaging {
    /// Toggle send failures
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Numbers a code was sent to so far
    pub fn sent_to(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingProvider for FakeMessaging {
    async fn send(&self, phone: &str) -> AppResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::external_service("verify", "Carrier rejected the number"));
        }
        self.sent.lock().unwrap().push(phone.to_owned());
        Ok(())
    }

    async fn verify_code(&self, _phone: &str, code: &str) -> AppResult<CodeCheck> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(if code == GOOD_CODE {
            CodeCheck::Approved
        } else {
            CodeCheck::Rejected
        })
    }
}

// ============================================================================
// Fault-injecting store
// ============================================================================

/// Store wrapper that can slow down or fail profile operations
pub struct FaultyDatabase {
    inner: Arc<dyn DatabaseProvider>,
    /// Delay applied to every profile read
    pub read_delay: Mutex<Option<Duration>>,
    /// Fail profile reads
    pub fail_reads: AtomicBool,
    /// Fail profile writes
    pub fail_writes: AtomicBool,
    /// Number of profile reads that reached the store
    pub profile_reads: AtomicUsize,
    /// Locations pushed through `update_profile_location`
    pub location_pushes: Mutex<Vec<(String, Coordinates)>>,
}

impl FaultyDatabase {
    /// Wrap `inner` with every fault disabled
    pub fn new(inner: Arc<dyn DatabaseProvider>) -> Self {
        Self {
            inner,
            read_delay: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            profile_reads: AtomicUsize::new(0),
            location_pushes: Mutex::new(Vec::new()),
        }
    }

    /// Delay profile reads by `delay`
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock().unwrap() = delay;
    }

    fn check_writes(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::database("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseProvider for FaultyDatabase {
    async fn migrate(&self) -> AppResult<()> {
        self.inner.migrate().await
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<UserProfile>> {
        self.profile_reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::database("injected read failure"));
        }
        self.inner.get_profile(id).await
    }

    async fn insert_profile(&self, profile: &UserProfile) -> AppResult<InsertOutcome> {
        self.check_writes()?;
        self.inner.insert_profile(profile).await
    }

    async fn update_profile(&self, profile: &UserProfile) -> AppResult<Option<UserProfile>> {
        self.check_writes()?;
        self.inner.update_profile(profile).await
    }

    async fn update_profile_location(
        &self,
        id: &str,
        location: Coordinates,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.location_pushes
            .lock()
            .unwrap()
            .push((id.to_owned(), location));
        self.check_writes()?;
        self.inner.update_profile_location(id, location, at).await
    }

    async fn store_pending_intent(
        &self,
        key: &str,
        intent: PendingIntent,
        created_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.inner
            .store_pending_intent(key, intent, created_at)
            .await
    }

    async fn take_pending_intent(
        &self,
        key: &str,
        not_before: DateTime<Utc>,
    ) -> AppResult<Option<PendingIntent>> {
        self.inner.take_pending_intent(key, not_before).await
    }

    async fn purge_pending_intents(&self, older_than: DateTime<Utc>) -> AppResult<u64> {
        self.inner.purge_pending_intents(older_than).await
    }

    async fn create_request(&self, request: &WasteRequest) -> AppResult<()> {
        self.inner.create_request(request).await
    }

    async fn get_request(&self, id: Uuid) -> AppResult<Option<WasteRequest>> {
        self.inner.get_request(id).await
    }

    async fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<WasteRequest>> {
        self.inner.list_requests(status).await
    }

    async fn claim_request(
        &self,
        id: Uuid,
        collector_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ClaimOutcome> {
        self.inner.claim_request(id, collector_id, at).await
    }

    async fn transition_request(
        &self,
        id: Uuid,
        actor: RequestActor,
        actor_id: &str,
        from: RequestStatus,
        to: RequestStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<WasteRequest>> {
        self.inner
            .transition_request(id, actor, actor_id, from, to, at)
            .await
    }
}

// ============================================================================
// Full server wiring
// ============================================================================

/// Server resources plus handles on the fakes behind them
pub struct TestServer {
    /// Shared resources
    pub resources: Arc<ServerResources>,
    /// Store the resources were built on
    pub database: Arc<FaultyDatabase>,
    /// Identity provider behind the resolver
    pub identity: Arc<FakeIdentityProvider>,
    /// Messaging service behind the verification gate
    pub messaging: Arc<FakeMessaging>,
}

impl TestServer {
    /// Store a profile and issue a session token for it
    pub async fn create_user(&self, id: &str, user_type: UserType) -> Result<(UserProfile, String)> {
        let profile = test_profile(id, user_type);
        self.database.insert_profile(&profile).await?;
        let token = self.resources.sessions.issue(&profile)?;
        Ok((profile, token))
    }

    /// Application router over these resources
    pub fn router(&self) -> axum::Router {
        wastelink_server::routes::router(&self.resources)
    }
}

/// Wire a complete server over an in-memory store and fake external services
pub async fn create_test_server() -> Result<TestServer> {
    let sqlite: Arc<dyn DatabaseProvider> = create_test_database().await?;
    let database = Arc::new(FaultyDatabase::new(sqlite));
    let identity = Arc::new(FakeIdentityProvider::default());
    let messaging = Arc::new(FakeMessaging::default());

    let config = test_config();
    let sessions = SessionManager::new(&config.session)?;
    let resources = Arc::new(ServerResources::new(
        Arc::new(config),
        Arc::clone(&database) as Arc<dyn DatabaseProvider>,
        create_test_cache().await,
        Arc::clone(&identity) as Arc<dyn IdentityProvider>,
        Arc::clone(&messaging) as Arc<dyn MessagingProvider>,
        sessions,
    ));

    Ok(TestServer {
        resources,
        database,
        identity,
        messaging,
    })
}
