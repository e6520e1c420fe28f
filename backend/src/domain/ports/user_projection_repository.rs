//! Port abstraction for the user projection store and its errors.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{EmailAddress, UserId, UserProjection};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user projection adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// The write would give two users the same email address.
        EmailConflict { message: String } => "user email already in use: {message}",
    }
}

/// Result of a conditional upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The row was inserted or overwritten.
    Applied,
    /// A row with a newer `updated_at` already exists; nothing changed.
    Stale,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserProjectionRepository: Send + Sync {
    /// Insert the projection, or overwrite email, name, avatar and
    /// `updated_at` when the stored `updated_at` is not newer.
    async fn upsert_if_newer(
        &self,
        projection: &UserProjection,
    ) -> Result<UpsertOutcome, UserPersistenceError>;

    /// Fetch a projection by identifier.
    async fn find_by_id(&self, id: &UserId)
    -> Result<Option<UserProjection>, UserPersistenceError>;

    /// Rewrite a user's email and advance `updated_at` to at least
    /// `updated_at`. Returns `false` when no such user exists.
    async fn update_email_by_id(
        &self,
        id: &UserId,
        email: &EmailAddress,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, UserPersistenceError>;
}
