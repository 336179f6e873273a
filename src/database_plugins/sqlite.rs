// ABOUTME: SQLite implementation of the storage provider using sqlx
// ABOUTME: Inline schema migrations plus conditional updates for request claims and transitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;
use wastelink_core::errors::{AppError, AppResult};
use wastelink_core::models::{
    Coordinates, PendingIntent, RequestStatus, UserProfile, WasteRequest,
};

use super::{ClaimOutcome, DatabaseProvider, InsertOutcome, RequestActor};
use crate::config::DatabaseUrl;

const PROFILE_COLUMNS: &str = "id, email, full_name, user_type, phone, address, \
     email_verified, phone_verified, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, dumper_id, collector_id, waste_type, description, \
     latitude, longitude, address, status, scheduled_time, estimated_amount, photos, \
     created_at, updated_at";

/// `SQLite` database implementation
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if needed) the database and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, the connection fails,
    /// or a migration statement fails
    pub async fn new(url: &DatabaseUrl) -> AppResult<Self> {
        if let DatabaseUrl::SQLite { path } = url {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::database(format!(
                        "Cannot create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let options =
            SqliteConnectOptions::from_str(&url.to_connection_string())?.create_if_missing(true);

        // Every connection to `:memory:` is its own database, so pin exactly one
        let pool_options = if url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options.connect_with(options).await?;
        let db = Self { pool };
        db.migrate().await?;

        info!(database = %url.to_connection_string(), "Database ready");
        Ok(db)
    }

    /// Fresh in-memory database
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail
    pub async fn in_memory() -> AppResult<Self> {
        Self::new(&DatabaseUrl::Memory).await
    }

    /// Underlying pool, for readiness probes
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate_profiles(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_profiles (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                full_name TEXT NOT NULL,
                user_type TEXT NOT NULL DEFAULT 'dumper' CHECK (user_type IN ('dumper', 'collector')),
                phone TEXT,
                address TEXT,
                email_verified BOOLEAN NOT NULL DEFAULT 0,
                phone_verified BOOLEAN NOT NULL DEFAULT 0,
                latitude REAL,
                longitude REAL,
                location_updated_at DATETIME,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_pending_intents(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS pending_intents (
                intent_key TEXT PRIMARY KEY,
                user_type TEXT NOT NULL CHECK (user_type IN ('dumper', 'collector')),
                created_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pending_intents_created ON pending_intents(created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_requests(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS waste_requests (
                id TEXT PRIMARY KEY,
                dumper_id TEXT NOT NULL,
                collector_id TEXT,
                waste_type TEXT NOT NULL,
                description TEXT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                address TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'matched', 'in_progress', 'completed', 'cancelled')),
                scheduled_time DATETIME,
                estimated_amount REAL,
                photos TEXT NOT NULL DEFAULT '[]',
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                CHECK ((collector_id IS NULL) = (status IN ('pending', 'cancelled')))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_waste_requests_status ON waste_requests(status)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_waste_requests_dumper ON waste_requests(dumper_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_waste_requests_collector ON waste_requests(collector_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_profile(row: &SqliteRow) -> AppResult<UserProfile> {
        let user_type: String = row.try_get("user_type")?;
        Ok(UserProfile {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            user_type: user_type.parse()?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            email_verified: row.try_get("email_verified")?,
            phone_verified: row.try_get("phone_verified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_request(row: &SqliteRow) -> AppResult<WasteRequest> {
        let id: String = row.try_get("id")?;
        let id = Uuid::parse_str(&id)
            .map_err(|e| AppError::database(format!("Stored request id {id} is not a UUID: {e}")))?;
        let waste_type: String = row.try_get("waste_type")?;
        let status: String = row.try_get("status")?;
        let photos: String = row.try_get("photos")?;

        Ok(WasteRequest {
            id,
            dumper_id: row.try_get("dumper_id")?,
            collector_id: row.try_get("collector_id")?,
            waste_type: waste_type.parse()?,
            description: row.try_get("description")?,
            location: Coordinates::new(row.try_get("latitude")?, row.try_get("longitude")?),
            address: row.try_get("address")?,
            status: status.parse()?,
            scheduled_time: row.try_get("scheduled_time")?,
            estimated_amount: row.try_get("estimated_amount")?,
            photos: serde_json::from_str(&photos)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl DatabaseProvider for SqliteDatabase {
    async fn migrate(&self) -> AppResult<()> {
        self.migrate_profiles().await?;
        self.migrate_pending_intents().await?;
        self.migrate_requests().await?;
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<UserProfile>> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    async fn insert_profile(&self, profile: &UserProfile) -> AppResult<InsertOutcome> {
        let result = sqlx::query(
            r"
            INSERT INTO user_profiles (
                id, email, full_name, user_type, phone, address,
                email_verified, phone_verified, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.user_type.as_str())
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(profile.email_verified)
        .bind(profile.phone_verified)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(profile_id = %profile.id, "Profile insert hit an existing row");
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn update_profile(&self, profile: &UserProfile) -> AppResult<Option<UserProfile>> {
        let query = format!(
            r"
            UPDATE user_profiles
            SET email = ?, full_name = ?, user_type = ?, phone = ?, address = ?,
                email_verified = ?, phone_verified = ?, updated_at = ?
            WHERE id = ?
            RETURNING {PROFILE_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(&profile.email)
            .bind(&profile.full_name)
            .bind(profile.user_type.as_str())
            .bind(&profile.phone)
            .bind(&profile.address)
            .bind(profile.email_verified)
            .bind(profile.phone_verified)
            .bind(profile.updated_at)
            .bind(&profile.id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    async fn update_profile_location(
        &self,
        id: &str,
        location: Coordinates,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE user_profiles
            SET latitude = ?, longitude = ?, location_updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(location.lat)
        .bind(location.lng)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn store_pending_intent(
        &self,
        key: &str,
        intent: PendingIntent,
        created_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO pending_intents (intent_key, user_type, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(intent_key) DO UPDATE SET
                user_type = excluded.user_type,
                created_at = excluded.created_at
            ",
        )
        .bind(key)
        .bind(intent.user_type.as_str())
        .bind(created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn take_pending_intent(
        &self,
        key: &str,
        not_before: DateTime<Utc>,
    ) -> AppResult<Option<PendingIntent>> {
        let row = sqlx::query(
            "DELETE FROM pending_intents WHERE intent_key = ? RETURNING user_type, created_at",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: i64 = row.try_get("created_at")?;
        if created_at < not_before.timestamp() {
            debug!(intent_key = %key, "Discarding expired pending intent");
            return Ok(None);
        }

        let user_type: String = row.try_get("user_type")?;
        Ok(Some(PendingIntent {
            user_type: user_type.parse()?,
        }))
    }

    async fn purge_pending_intents(&self, older_than: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM pending_intents WHERE created_at < ?")
            .bind(older_than.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn create_request(&self, request: &WasteRequest) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO waste_requests (
                id, dumper_id, collector_id, waste_type, description, latitude, longitude,
                address, status, scheduled_time, estimated_amount, photos, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(request.id.to_string())
        .bind(&request.dumper_id)
        .bind(&request.collector_id)
        .bind(request.waste_type.as_str())
        .bind(&request.description)
        .bind(request.location.lat)
        .bind(request.location.lng)
        .bind(&request.address)
        .bind(request.status.as_str())
        .bind(request.scheduled_time)
        .bind(request.estimated_amount)
        .bind(serde_json::to_string(&request.photos)?)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> AppResult<Option<WasteRequest>> {
        let query = format!("SELECT {REQUEST_COLUMNS} FROM waste_requests WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_request).transpose()
    }

    async fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<WasteRequest>> {
        let rows = if let Some(status) = status {
            let query = format!(
                "SELECT {REQUEST_COLUMNS} FROM waste_requests WHERE status = ? ORDER BY created_at DESC"
            );
            sqlx::query(&query)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
        } else {
            let query =
                format!("SELECT {REQUEST_COLUMNS} FROM waste_requests ORDER BY created_at DESC");
            sqlx::query(&query).fetch_all(&self.pool).await?
        };

        rows.iter().map(Self::row_to_request).collect()
    }

    async fn claim_request(
        &self,
        id: Uuid,
        collector_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ClaimOutcome> {
        let query = format!(
            r"
            UPDATE waste_requests
            SET collector_id = ?, status = 'matched', updated_at = ?
            WHERE id = ? AND status = 'pending' AND collector_id IS NULL
            RETURNING {REQUEST_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(collector_id)
            .bind(at)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(ClaimOutcome::Claimed(Self::row_to_request(&row)?)),
            None => Ok(ClaimOutcome::AlreadyClaimed),
        }
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
        let query = format!(
            r"
            UPDATE waste_requests
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ? AND {column} = ?
            RETURNING {REQUEST_COLUMNS}
            ",
            column = actor.column(),
        );
        let row = sqlx::query(&query)
            .bind(to.as_str())
            .bind(at)
            .bind(id.to_string())
            .bind(from.as_str())
            .bind(actor_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_request).transpose()
    }
}
