//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for tests and when the `test-support` feature is enabled.

mod clock;
mod identity_events;
mod user_store;

pub use clock::MutableClock;
pub use identity_events::{
    SignedDelivery, TEST_WEBHOOK_SECRET, deleted_event, sign_delivery, user_event,
};
pub use user_store::InMemoryUserStore;
