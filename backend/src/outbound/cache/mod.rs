//! Cache store adapters.
//!
//! - [`RedisCacheStore`]: `bb8-redis` pool used by the server.
//! - [`MemoryCacheStore`]: in-process map with clock-driven expiry for tests
//!   and local runs.

mod memory;
mod redis;

pub use memory::MemoryCacheStore;
pub use redis::{RedisCacheConfig, RedisCacheError, RedisCacheStore};
