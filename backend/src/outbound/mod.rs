//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **cache**: Redis-backed and in-process `CacheStore` implementations
//!
//! Adapters convert between domain types and storage representations. They
//! contain no business logic.

pub mod cache;
pub mod persistence;
