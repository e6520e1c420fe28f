//! In-process cache store with expiry driven by an injected clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::CacheKey;
use crate::domain::ports::{CacheStore, CacheStoreError};

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Map-backed [`CacheStore`]. Expired entries are dropped lazily on read.
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> Result<usize, CacheStoreError> {
        Ok(self.lock()?.len())
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> Result<bool, CacheStoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Whether a live entry exists under `key`.
    pub fn contains(&self, key: &CacheKey) -> Result<bool, CacheStoreError> {
        let now = self.clock.utc();
        Ok(self
            .lock()?
            .get(key.as_str())
            .is_some_and(|entry| entry.expires_at > now))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheStoreError> {
        self.entries
            .lock()
            .map_err(|_| CacheStoreError::backend("memory cache lock poisoned"))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        match entries.get(key.as_str()) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheStoreError> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|err| CacheStoreError::backend(format!("invalid ttl: {err}")))?;
        let expires_at = self.clock.utc() + ttl;
        self.lock()?.insert(
            key.as_str().to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[CacheKey]) -> Result<(), CacheStoreError> {
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(key.as_str());
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheStoreError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CacheNamespace, QuizId, UserId};
    use crate::test_support::MutableClock;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        Arc::new(MutableClock::new(start))
    }

    #[rstest]
    #[tokio::test]
    async fn value_is_readable_until_ttl_elapses(clock: Arc<MutableClock>) {
        let store = MemoryCacheStore::new(clock.clone());
        let key = CacheKey::quiz(&QuizId::random());

        store
            .set_with_ttl(&key, "{}", Duration::from_secs(900))
            .await
            .expect("set succeeds");
        clock.advance_seconds(899);
        assert_eq!(
            store.get(&key).await.expect("get succeeds").as_deref(),
            Some("{}")
        );

        clock.advance_seconds(1);
        assert_eq!(store.get(&key).await.expect("get succeeds"), None);
        assert!(store.is_empty().expect("lock"));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_removes_only_named_keys(clock: Arc<MutableClock>) {
        let store = MemoryCacheStore::new(clock);
        let quiz = CacheKey::quiz(&QuizId::random());
        let public = CacheKey::public_quizzes();
        for key in [&quiz, &public] {
            store
                .set_with_ttl(key, "[]", Duration::from_secs(60))
                .await
                .expect("set succeeds");
        }

        store
            .delete(std::slice::from_ref(&quiz))
            .await
            .expect("delete succeeds");

        assert!(!store.contains(&quiz).expect("lock"));
        assert!(store.contains(&public).expect("lock"));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_prefix_clears_one_namespace(clock: Arc<MutableClock>) {
        let store = MemoryCacheStore::new(clock);
        let user = UserId::new("user_1").expect("valid id");
        let quiz = QuizId::random();
        let keys = [
            CacheKey::leaderboard(&quiz),
            CacheKey::leaderboard(&QuizId::random()),
            CacheKey::quiz_attempts(&user, &quiz),
        ];
        for key in &keys {
            store
                .set_with_ttl(key, "[]", Duration::from_secs(60))
                .await
                .expect("set succeeds");
        }

        let removed = store
            .delete_prefix(CacheNamespace::Leaderboard.prefix())
            .await
            .expect("delete succeeds");

        assert_eq!(removed, 2);
        assert!(store.contains(&keys[2]).expect("lock"));
    }
}
