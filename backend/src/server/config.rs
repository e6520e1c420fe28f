//! HTTP server configuration object.

use std::net::SocketAddr;
use std::sync::Arc;

use quiz_backend::domain::SigningSecret;
use quiz_backend::outbound::cache::RedisCacheStore;
use quiz_backend::outbound::persistence::DbPool;

/// Everything `create_server` needs, resolved before the listener binds.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) cache: Arc<RedisCacheStore>,
    pub(crate) webhook_secret: SigningSecret,
}

impl ServerConfig {
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        db_pool: DbPool,
        cache: Arc<RedisCacheStore>,
        webhook_secret: SigningSecret,
    ) -> Self {
        Self {
            bind_addr,
            db_pool,
            cache,
            webhook_secret,
        }
    }
}
