//! Startup configuration.
//!
//! Secrets come from the process environment through [`mockable::Env`] so
//! tests can inject them without touching the real environment. Non-secret
//! server settings load through OrthoConfig with the `QUIZ_` prefix. Both are
//! resolved once in `main` and passed to constructors explicitly.

use std::net::SocketAddr;

use mockable::Env;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::domain::{SigningSecret, SigningSecretError};
use crate::outbound::cache::{RedisCacheConfig, RedisCacheError};

pub const WEBHOOK_SECRET_ENV: &str = "IDENTITY_WEBHOOK_SECRET";
pub const CACHE_URL_ENV: &str = "CACHE_URL";
pub const CACHE_TOKEN_ENV: &str = "CACHE_TOKEN";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing or blank.
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    /// The webhook signing secret cannot be decoded.
    #[error("invalid {WEBHOOK_SECRET_ENV}: {source}")]
    WebhookSecret {
        #[source]
        source: SigningSecretError,
    },
    /// The cache endpoint is unusable.
    #[error("invalid cache configuration: {source}")]
    Cache {
        #[source]
        source: RedisCacheError,
    },
    /// The bind address is not `host:port`.
    #[error("invalid bind address '{value}'")]
    BindAddr { value: String },
}

/// Secrets required before any adapter can be built.
pub struct AppSecrets {
    pub webhook_secret: SigningSecret,
    pub cache: RedisCacheConfig,
    pub database_url: Zeroizing<String>,
}

impl std::fmt::Debug for AppSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSecrets")
            .field("webhook_secret", &self.webhook_secret)
            .field("cache", &self.cache)
            .field("database_url", &"<redacted>")
            .finish()
    }
}

fn required<E: Env>(env: &E, name: &'static str) -> Result<Zeroizing<String>, ConfigError> {
    match env.string(name) {
        Some(value) if !value.trim().is_empty() => Ok(Zeroizing::new(value)),
        _ => Err(ConfigError::MissingEnv { name }),
    }
}

/// Read and validate every secret. Any failure is fatal at startup.
///
/// # Examples
///
/// ```rust
/// use mockable::MockEnv;
/// use quiz_backend::config::load_secrets;
///
/// let mut env = MockEnv::new();
/// env.expect_string().returning(|name| match name {
///     "IDENTITY_WEBHOOK_SECRET" => Some("whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw".to_owned()),
///     "CACHE_URL" => Some("redis://cache.internal:6379".to_owned()),
///     "CACHE_TOKEN" => Some("token".to_owned()),
///     "DATABASE_URL" => Some("postgres://localhost/quiz".to_owned()),
///     _ => None,
/// });
///
/// let secrets = load_secrets(&env).expect("complete environment");
/// assert_eq!(secrets.database_url.as_str(), "postgres://localhost/quiz");
/// ```
pub fn load_secrets<E: Env>(env: &E) -> Result<AppSecrets, ConfigError> {
    let raw_secret = required(env, WEBHOOK_SECRET_ENV)?;
    let webhook_secret = SigningSecret::parse(&raw_secret)
        .map_err(|source| ConfigError::WebhookSecret { source })?;

    let cache_url = required(env, CACHE_URL_ENV)?;
    let cache_token = required(env, CACHE_TOKEN_ENV)?;
    let cache = RedisCacheConfig::new(cache_url.as_str(), cache_token.as_str());
    cache
        .authenticated_url()
        .map_err(|source| ConfigError::Cache { source })?;

    let database_url = required(env, DATABASE_URL_ENV)?;

    Ok(AppSecrets {
        webhook_secret,
        cache,
        database_url,
    })
}

/// Non-secret HTTP server settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "QUIZ")]
pub struct ServerSettings {
    /// Socket address to bind, `host:port`.
    pub bind_addr: Option<String>,
    /// Maximum PostgreSQL connections.
    #[ortho_config(default = 10)]
    pub db_pool_size: u32,
}

impl ServerSettings {
    /// Parsed bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|_| ConfigError::BindAddr {
            value: value.to_owned(),
        })
    }
}
