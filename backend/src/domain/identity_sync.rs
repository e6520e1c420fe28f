//! Identity synchronisation service.
//!
//! Applies verified identity events to the local user projection. Created and
//! updated events share one conditional upsert keyed on the payload's
//! `updated_at`, so redelivered or reordered events converge on the newest
//! provider state. Deletes rewrite the email to a per-user sentinel and keep
//! the row. A delete that arrives before the user was ever projected leaves a
//! sentinel tombstone stamped with the delivery time, so a late create cannot
//! bring the user back.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    CacheStore, IdentitySyncCommand, UpsertOutcome, UserPersistenceError,
    UserProjectionRepository,
};
use crate::domain::{
    CacheKey, CacheNamespace, DeletedUserPayload, DisplayName, EmailAddress, Error, IdentityEvent,
    IdentityPayloadError, IdentityUserPayload, ReadThroughCache, UpsertKind, UserId,
    UserProjection, VerifiedEnvelope,
};

/// What applying an event did to the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The projection now reflects the event.
    Upserted,
    /// A newer state was already stored.
    Stale,
    /// The user's email was replaced by the deletion sentinel.
    SoftDeleted,
    /// A delete arrived for a user that was never projected; a tombstone
    /// row now holds the sentinel email.
    Missing,
    /// The event type is not handled.
    Ignored,
}

impl SyncOutcome {
    /// Stable label reported back to the webhook sender.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upserted => "upserted",
            Self::Stale => "stale",
            Self::SoftDeleted => "soft_deleted",
            Self::Missing => "missing",
            Self::Ignored => "ignored",
        }
    }
}

/// Store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Upsert,
    SoftDelete,
}

impl SyncOperation {
    /// Stable label for logs and error details.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::SoftDelete => "soft_delete",
        }
    }
}

/// Failures applying an identity event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The user payload carries no usable email address.
    #[error("user {user_id} has no email address")]
    MissingEmail { user_id: String },
    /// The payload decoded but its values are unusable.
    #[error("malformed identity payload: {message}")]
    MalformedPayload { message: String },
    /// The projection store rejected or could not run the write.
    #[error("user store {} failed: {source}", .operation.as_str())]
    Store {
        operation: SyncOperation,
        #[source]
        source: UserPersistenceError,
    },
}

impl From<IdentityPayloadError> for SyncError {
    fn from(error: IdentityPayloadError) -> Self {
        match error {
            IdentityPayloadError::MissingEmail { user_id } => Self::MissingEmail { user_id },
            other => Self::MalformedPayload {
                message: other.to_string(),
            },
        }
    }
}

impl From<SyncError> for Error {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::MissingEmail { user_id } => {
                Error::invalid_request(format!("user {user_id} has no email address"))
                    .with_details(json!({ "code": "missing_email", "userId": user_id }))
            }
            SyncError::MalformedPayload { message } => Error::invalid_request(message),
            SyncError::Store { operation, source } => Error::internal(format!(
                "user store {} failed: {source}",
                operation.as_str()
            )),
        }
    }
}

/// Identity synchroniser implementing [`IdentitySyncCommand`].
pub struct IdentitySyncService<R, C: ?Sized> {
    users: Arc<R>,
    cache: ReadThroughCache<C>,
}

impl<R, C: ?Sized> Clone for IdentitySyncService<R, C> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            cache: self.cache.clone(),
        }
    }
}

impl<R, C> IdentitySyncService<R, C>
where
    R: UserProjectionRepository,
    C: CacheStore + ?Sized,
{
    /// Create a service over the user store and cache.
    pub fn new(users: Arc<R>, cache: Arc<C>) -> Self {
        Self {
            users,
            cache: ReadThroughCache::new(cache),
        }
    }

    async fn upsert(
        &self,
        kind: UpsertKind,
        payload: &IdentityUserPayload,
    ) -> Result<SyncOutcome, SyncError> {
        let projection = payload.to_projection()?;
        let outcome = self
            .users
            .upsert_if_newer(&projection)
            .await
            .map_err(|source| SyncError::Store {
                operation: SyncOperation::Upsert,
                source,
            })?;

        match outcome {
            UpsertOutcome::Applied => {
                info!(
                    user_id = %projection.id,
                    event_type = kind.as_str(),
                    "user projection upserted"
                );
                self.invalidate_user(&projection.id).await;
                // Leaderboards embed user names.
                if kind == UpsertKind::Updated {
                    self.invalidate_leaderboards().await;
                }
                Ok(SyncOutcome::Upserted)
            }
            UpsertOutcome::Stale => {
                info!(
                    user_id = %projection.id,
                    event_type = kind.as_str(),
                    "stale identity event skipped"
                );
                Ok(SyncOutcome::Stale)
            }
        }
    }

    async fn soft_delete(
        &self,
        payload: &DeletedUserPayload,
        envelope: &VerifiedEnvelope,
    ) -> Result<SyncOutcome, SyncError> {
        let id = payload.user_id()?;
        let sentinel = EmailAddress::deleted_sentinel(&id);
        let found = self
            .users
            .update_email_by_id(&id, &sentinel, envelope.timestamp)
            .await
            .map_err(|source| SyncError::Store {
                operation: SyncOperation::SoftDelete,
                source,
            })?;

        if !found {
            let tombstone = UserProjection {
                id: id.clone(),
                email: sentinel,
                name: DisplayName::unknown(),
                avatar: None,
                created_at: envelope.timestamp,
                updated_at: envelope.timestamp,
            };
            let outcome = self
                .users
                .upsert_if_newer(&tombstone)
                .await
                .map_err(|source| SyncError::Store {
                    operation: SyncOperation::SoftDelete,
                    source,
                })?;
            info!(user_id = %id, ?outcome, "delete for unknown user recorded as tombstone");
            return Ok(SyncOutcome::Missing);
        }
        info!(user_id = %id, "user projection soft deleted");
        self.invalidate_user(&id).await;
        Ok(SyncOutcome::SoftDeleted)
    }

    async fn invalidate_leaderboards(&self) {
        match self.cache.invalidate_namespace(CacheNamespace::Leaderboard).await {
            Ok(removed) => debug!(removed, "leaderboards cleared after user update"),
            Err(error) => warn!(%error, "leaderboard invalidation failed; names may be stale"),
        }
    }

    async fn invalidate_user(&self, id: &UserId) {
        let key = CacheKey::user_quizzes(id);
        if let Err(error) = self.cache.invalidate(std::slice::from_ref(&key)).await {
            warn!(key = %key, %error, "cache invalidation failed; proceeding with stale entry");
        }
    }
}

#[async_trait]
impl<R, C> IdentitySyncCommand for IdentitySyncService<R, C>
where
    R: UserProjectionRepository,
    C: CacheStore + ?Sized,
{
    async fn apply(&self, envelope: &VerifiedEnvelope) -> Result<SyncOutcome, SyncError> {
        match &envelope.event {
            IdentityEvent::UserUpserted { kind, payload } => self.upsert(*kind, payload).await,
            IdentityEvent::UserDeleted(payload) => self.soft_delete(payload, envelope).await,
            IdentityEvent::Unhandled { event_type } => {
                info!(
                    message_id = %envelope.message_id,
                    event_type = %event_type,
                    "identity event type not handled"
                );
                Ok(SyncOutcome::Ignored)
            }
        }
    }
}

#[cfg(test)]
#[path = "identity_sync_tests.rs"]
mod tests;
