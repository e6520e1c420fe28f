//! PostgreSQL-backed `UserProjectionRepository` implementation using Diesel ORM.
//!
//! Upserts are conditional on `updated_at` so the database, not the caller,
//! decides whether an event is stale. Concurrent deliveries for the same user
//! therefore converge without application-level locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Timestamptz;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UpsertOutcome, UserPersistenceError, UserProjectionRepository};
use crate::domain::{DisplayName, EmailAddress, UserId, UserProjection};

use super::diesel_basic_error_mapping::{DieselFailure, classify_diesel_error, pool_error_message};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

const EMAIL_CONSTRAINT: &str = "users_email_key";

diesel::define_sql_function! {
    /// SQL `GREATEST` over two timestamps.
    fn greatest(a: Timestamptz, b: Timestamptz) -> Timestamptz;
}

/// Diesel-backed implementation of the `UserProjectionRepository` port.
#[derive(Clone)]
pub struct DieselUserProjectionRepository {
    pool: DbPool,
}

impl DieselUserProjectionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    UserPersistenceError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> UserPersistenceError {
    match classify_diesel_error(error, operation) {
        DieselFailure::Connection(message) => UserPersistenceError::connection(message),
        DieselFailure::UniqueViolation { constraint }
            if constraint.as_deref() == Some(EMAIL_CONSTRAINT) =>
        {
            UserPersistenceError::email_conflict("email belongs to another user")
        }
        DieselFailure::UniqueViolation { .. } => {
            UserPersistenceError::query("unique constraint violated")
        }
        DieselFailure::ForeignKeyViolation { .. } | DieselFailure::ConstraintViolation { .. } => {
            UserPersistenceError::query("constraint violated")
        }
        DieselFailure::Query(message) => UserPersistenceError::query(message),
    }
}

fn row_to_projection(row: UserRow) -> Result<UserProjection, UserPersistenceError> {
    let invalid = |field: &str| {
        UserPersistenceError::query(format!("stored user {} has invalid {field}", row.id))
    };
    Ok(UserProjection {
        id: UserId::new(row.id.clone()).map_err(|_| invalid("id"))?,
        email: EmailAddress::new(row.email.clone()).map_err(|_| invalid("email"))?,
        name: DisplayName::new(row.name.clone()).map_err(|_| invalid("name"))?,
        avatar: row.avatar,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl UserProjectionRepository for DieselUserProjectionRepository {
    async fn upsert_if_newer(
        &self,
        projection: &UserProjection,
    ) -> Result<UpsertOutcome, UserPersistenceError> {
        use diesel::query_dsl::methods::FilterDsl;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewUserRow {
            id: projection.id.as_ref(),
            email: projection.email.as_ref(),
            name: projection.name.as_ref(),
            avatar: projection.avatar.as_deref(),
            created_at: projection.created_at,
            updated_at: projection.updated_at,
        };

        let affected = diesel::insert_into(users::table)
            .values(&row)
            .on_conflict(users::id)
            .do_update()
            .set((
                users::email.eq(excluded(users::email)),
                users::name.eq(excluded(users::name)),
                users::avatar.eq(excluded(users::avatar)),
                users::updated_at.eq(excluded(users::updated_at)),
            ))
            .filter(users::updated_at.le(excluded(users::updated_at)))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "upsert user projection"))?;

        Ok(if affected == 0 {
            UpsertOutcome::Stale
        } else {
            UpsertOutcome::Applied
        })
    }

    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<UserProjection>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::id.eq(id.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find user projection"))?;
        row.map(row_to_projection).transpose()
    }

    async fn update_email_by_id(
        &self,
        id: &UserId,
        email: &EmailAddress,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let affected = diesel::update(users::table.filter(users::id.eq(id.as_ref())))
            .set((
                users::email.eq(email.as_ref()),
                users::updated_at.eq(greatest(users::updated_at, updated_at)),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "update user email"))?;
        Ok(affected > 0)
    }
}
