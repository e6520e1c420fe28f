//! Port for the key-value store behind the read-through cache.
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::CacheKey;

define_port_error! {
    /// Errors surfaced by cache store adapters.
    pub enum CacheStoreError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "cache backend failure: {message}",
    }
}

/// Raw string store with per-entry expiry.
///
/// Values are opaque serialised aggregates; the caller owns encoding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the value stored under `key`, if present and unexpired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError>;

    /// Write `value` under `key`, replacing any previous entry.
    async fn set_with_ttl(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheStoreError>;

    /// Remove the given keys. Missing keys are ignored.
    async fn delete(&self, keys: &[CacheKey]) -> Result<(), CacheStoreError>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheStoreError>;
}
