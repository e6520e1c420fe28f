//! Read-through cache over a [`CacheStore`].
//!
//! Reads never fail because of the cache: store errors and undecodable values
//! are treated as misses. Writes are best effort. Invalidation failures are
//! surfaced so the write path can decide whether to proceed with a known-stale
//! cache; every caller in this crate logs and proceeds.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::cache_key::{CacheKey, CacheNamespace};
use super::ports::CacheStore;

/// Invalidation could not reach the cache backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cache unavailable: {message}")]
pub struct CacheUnavailable {
    pub message: String,
}

/// Typed JSON cache with TTLs taken from the key namespace.
pub struct ReadThroughCache<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ReadThroughCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ReadThroughCache<S>
where
    S: CacheStore + ?Sized,
{
    /// Wrap a cache store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Read and decode the value under `key`. Errors count as misses.
    pub async fn get<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "cache miss");
                return None;
            }
            Err(error) => {
                warn!(key = %key, %error, "cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %key, "cache hit");
                Some(value)
            }
            Err(error) => {
                warn!(key = %key, %error, "cached value could not be decoded; treating as miss");
                None
            }
        }
    }

    /// Store `value` under `key` with the namespace TTL. Failures are logged.
    pub async fn set<T>(&self, key: &CacheKey, value: &T)
    where
        T: Serialize + ?Sized,
    {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(key = %key, %error, "cache value could not be encoded");
                return;
            }
        };

        if let Err(error) = self.store.set_with_ttl(key, &raw, key.ttl()).await {
            warn!(key = %key, %error, "cache write failed");
        }
    }

    /// Remove `keys` before their TTL elapses.
    pub async fn invalidate(&self, keys: &[CacheKey]) -> Result<(), CacheUnavailable> {
        if keys.is_empty() {
            return Ok(());
        }
        self.store
            .delete(keys)
            .await
            .map_err(|error| CacheUnavailable {
                message: error.to_string(),
            })
    }

    /// Remove every entry of `namespace`, returning how many were removed.
    pub async fn invalidate_namespace(
        &self,
        namespace: CacheNamespace,
    ) -> Result<u64, CacheUnavailable> {
        self.store
            .delete_prefix(namespace.prefix())
            .await
            .map_err(|error| CacheUnavailable {
                message: error.to_string(),
            })
    }

    /// Return the cached value or load, populate, and return it.
    ///
    /// Loader errors are returned unchanged and nothing is cached. Concurrent
    /// misses for the same key may each invoke their loader.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &CacheKey, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.set(key, &value).await;
        Ok(value)
    }
}
