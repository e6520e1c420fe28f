//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations translate between Diesel rows and domain types
//! and map database failures onto the port error enums. Row structs and the
//! schema stay private to this module.
//!
//! # Example
//!
//! ```ignore
//! use quiz_backend::outbound::persistence::{DbPool, DieselQuizRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/quiz")).await?;
//! let quizzes = DieselQuizRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_quiz_repository;
mod diesel_user_projection_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_quiz_repository::DieselQuizRepository;
pub use diesel_user_projection_repository::DieselUserProjectionRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
