//! Backend entry-point: resolves configuration, prepares the database and
//! cache pools, and serves the HTTP API.

mod server;

use std::ffi::OsString;
use std::sync::Arc;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use quiz_backend::config::{ServerSettings, load_secrets};
use quiz_backend::inbound::http::health::HealthState;
use quiz_backend::outbound::cache::RedisCacheStore;
use quiz_backend::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let secrets = load_secrets(&DefaultEnv::new()).map_err(std::io::Error::other)?;
    let settings = ServerSettings::load_from_iter(std::env::args_os().collect::<Vec<OsString>>())
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    info!(
        webhook_secret = secrets.webhook_secret.fingerprint(),
        %bind_addr,
        "configuration loaded"
    );

    let database_url = secrets.database_url.clone();
    let applied = tokio::task::spawn_blocking(move || run_migrations(&database_url))
        .await
        .map_err(std::io::Error::other)?
        .map_err(std::io::Error::other)?;
    info!(applied, "database schema up to date");

    let pool_config =
        PoolConfig::new(secrets.database_url.as_str()).with_max_size(settings.db_pool_size);
    let db_pool = DbPool::new(pool_config)
        .await
        .map_err(std::io::Error::other)?;
    let cache = RedisCacheStore::connect(secrets.cache)
        .await
        .map_err(std::io::Error::other)?;

    let health_state = web::Data::new(HealthState::new());
    let config = ServerConfig::new(bind_addr, db_pool, Arc::new(cache), secrets.webhook_secret);
    let server = create_server(health_state.clone(), config)?;
    let result = server.await;
    health_state.mark_unhealthy();
    result
}
