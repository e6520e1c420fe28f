//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_store;
mod identity_sync_command;
mod quiz_command;
mod quiz_query;
mod quiz_repository;
mod user_projection_repository;

#[cfg(test)]
pub use cache_store::MockCacheStore;
pub use cache_store::{CacheStore, CacheStoreError};
pub use identity_sync_command::IdentitySyncCommand;
#[cfg(test)]
pub use identity_sync_command::MockIdentitySyncCommand;
#[cfg(test)]
pub use quiz_command::MockQuizCommand;
pub use quiz_command::QuizCommand;
#[cfg(test)]
pub use quiz_query::MockQuizQuery;
pub use quiz_query::{FixtureQuizQuery, QuizQuery};
#[cfg(test)]
pub use quiz_repository::MockQuizRepository;
pub use quiz_repository::{QuizPersistenceError, QuizRepository};
#[cfg(test)]
pub use user_projection_repository::MockUserProjectionRepository;
pub use user_projection_repository::{
    UpsertOutcome, UserPersistenceError, UserProjectionRepository,
};
