// ABOUTME: Server binary wiring configuration, storage, providers, and HTTP routes
// ABOUTME: Runs the WasteLink API until interrupted, purging stale sign-in intents in the background
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # WasteLink Server Binary
//!
//! Loads configuration from the environment, opens the store, and serves the
//! REST API with graceful shutdown on Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use wastelink_server::{
    auth::SessionManager,
    cache::{Cache, CacheProvider},
    config::ServerConfig,
    constants::identity::{PENDING_INTENT_PURGE_INTERVAL_SECS, PENDING_INTENT_TTL_SECS},
    context::ServerResources,
    database_plugins::{DatabaseProvider, SqliteDatabase},
    identity::OAuth2IdentityProvider,
    logging,
    routes,
    verification::HttpMessagingProvider,
};

#[derive(Parser)]
#[command(name = "wastelink-server")]
#[command(about = "WasteLink - matches waste pickup requests to nearby collectors")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting WasteLink server");
    info!("{}", config.summary());

    let database: Arc<dyn DatabaseProvider> =
        Arc::new(SqliteDatabase::new(&config.database.url).await?);
    info!(
        "Database initialized: {}",
        config.database.url.to_connection_string()
    );

    if !config.identity_provider.is_configured() {
        warn!("Identity provider is not fully configured; sign-in will fail");
    }
    if config.messaging.base_url.is_none() {
        warn!("Messaging service is not configured; phone verification will fail");
    }

    let cache = Cache::new(config.cache.clone()).await;
    let sessions = SessionManager::new(&config.session)?;
    let identity_provider = Arc::new(OAuth2IdentityProvider::new(
        config.identity_provider.clone(),
    ));
    let messaging = Arc::new(HttpMessagingProvider::new(config.messaging.clone()));

    let http_port = config.http_port;
    let resources = Arc::new(ServerResources::new(
        Arc::new(config),
        Arc::clone(&database),
        cache,
        identity_provider,
        messaging,
        sessions,
    ));

    let purge = tokio::spawn(purge_pending_intents(database));

    let app = routes::router(&resources);
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    purge.abort();

    if let Err(e) = served {
        error!("Server error: {e}");
        return Err(e.into());
    }
    info!("Server stopped");
    Ok(())
}

/// Periodically drop sign-in intents that outlived the redirect round trip
async fn purge_pending_intents(database: Arc<dyn DatabaseProvider>) {
    let mut interval =
        tokio::time::interval(Duration::from_secs(PENDING_INTENT_PURGE_INTERVAL_SECS));
    loop {
        interval.tick().await;
        let cutoff = Utc::now() - chrono::Duration::seconds(PENDING_INTENT_TTL_SECS);
        match database.purge_pending_intents(cutoff).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Purged expired sign-in intents"),
            Err(e) => warn!(error = %e, "Failed to purge sign-in intents"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received");
}
