//! In-memory user projection store with the same write rules as Postgres.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{UpsertOutcome, UserPersistenceError, UserProjectionRepository};
use crate::domain::{EmailAddress, UserId, UserProjection};

/// Map-backed [`UserProjectionRepository`].
///
/// Upserts only overwrite rows whose `updated_at` is not newer, and emails
/// are unique across users. [`InMemoryUserStore::fail_next`] makes the next
/// call fail with the given error.
#[derive(Default)]
pub struct InMemoryUserStore {
    rows: Mutex<HashMap<String, UserProjection>>,
    failure: Mutex<Option<UserPersistenceError>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly.
    pub fn insert(&self, projection: UserProjection) {
        self.rows_guard()
            .insert(projection.id.as_ref().to_owned(), projection);
    }

    /// Current row for `id`, if any.
    pub fn get(&self, id: &str) -> Option<UserProjection> {
        self.rows_guard().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows_guard().is_empty()
    }

    /// Fail the next repository call with `error`.
    pub fn fail_next(&self, error: UserPersistenceError) {
        *self.failure_guard() = Some(error);
    }

    fn take_failure(&self) -> Result<(), UserPersistenceError> {
        self.failure_guard().take().map_or(Ok(()), Err)
    }

    fn rows_guard(&self) -> MutexGuard<'_, HashMap<String, UserProjection>> {
        match self.rows.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("user store mutex"),
        }
    }

    fn failure_guard(&self) -> MutexGuard<'_, Option<UserPersistenceError>> {
        match self.failure.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("user store failure mutex"),
        }
    }
}

fn email_taken(
    rows: &HashMap<String, UserProjection>,
    id: &UserId,
    email: &EmailAddress,
) -> bool {
    rows.values()
        .any(|row| row.id != *id && row.email == *email)
}

#[async_trait]
impl UserProjectionRepository for InMemoryUserStore {
    async fn upsert_if_newer(
        &self,
        projection: &UserProjection,
    ) -> Result<UpsertOutcome, UserPersistenceError> {
        self.take_failure()?;
        let mut rows = self.rows_guard();
        // Staleness is decided on the id row before the email index is consulted.
        let stale = rows
            .get(projection.id.as_ref())
            .is_some_and(|existing| existing.updated_at > projection.updated_at);
        if stale {
            return Ok(UpsertOutcome::Stale);
        }
        if email_taken(&rows, &projection.id, &projection.email) {
            return Err(UserPersistenceError::email_conflict(
                projection.email.as_ref(),
            ));
        }

        match rows.get_mut(projection.id.as_ref()) {
            Some(existing) => {
                existing.email = projection.email.clone();
                existing.name = projection.name.clone();
                existing.avatar.clone_from(&projection.avatar);
                existing.updated_at = projection.updated_at;
                Ok(UpsertOutcome::Applied)
            }
            None => {
                rows.insert(projection.id.as_ref().to_owned(), projection.clone());
                Ok(UpsertOutcome::Applied)
            }
        }
    }

    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<UserProjection>, UserPersistenceError> {
        self.take_failure()?;
        Ok(self.rows_guard().get(id.as_ref()).cloned())
    }

    async fn update_email_by_id(
        &self,
        id: &UserId,
        email: &EmailAddress,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, UserPersistenceError> {
        self.take_failure()?;
        let mut rows = self.rows_guard();
        if email_taken(&rows, id, email) {
            return Err(UserPersistenceError::email_conflict(email.as_ref()));
        }
        let Some(row) = rows.get_mut(id.as_ref()) else {
            return Ok(false);
        };
        row.email = email.clone();
        row.updated_at = row.updated_at.max(updated_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::domain::DisplayName;

    fn projection(id: &str, email: &str, seconds: i64) -> UserProjection {
        let stamp = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .expect("valid timestamp");
        UserProjection {
            id: UserId::new(id).expect("valid id"),
            email: EmailAddress::new(email).expect("valid email"),
            name: DisplayName::unknown(),
            avatar: None,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn stale_event_wins_over_email_conflict() {
        let store = InMemoryUserStore::new();
        store.insert(projection("user_1", "ada@example.com", 200));
        store.insert(projection("user_2", "grace@example.com", 100));

        let outcome = store
            .upsert_if_newer(&projection("user_1", "grace@example.com", 150))
            .await
            .expect("stale events are not conflicts");

        assert_eq!(outcome, UpsertOutcome::Stale);
        let row = store.get("user_1").expect("row kept");
        assert_eq!(row.email.as_ref(), "ada@example.com");
    }

    #[rstest]
    #[tokio::test]
    async fn fresh_event_with_taken_email_conflicts() {
        let store = InMemoryUserStore::new();
        store.insert(projection("user_1", "ada@example.com", 100));
        store.insert(projection("user_2", "grace@example.com", 100));

        let err = store
            .upsert_if_newer(&projection("user_1", "grace@example.com", 300))
            .await
            .expect_err("email belongs to user_2");

        assert!(matches!(err, UserPersistenceError::EmailConflict { .. }));
    }
}
