//! Behaviour tests for identity webhook synchronisation.
//!
//! Deliveries are signed and verified exactly as the HTTP adapter does, then
//! applied through the synchroniser against in-memory adapters.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quiz_backend::domain::ports::{CacheStore, IdentitySyncCommand};
use quiz_backend::domain::{
    CacheKey, IdentitySyncService, SigningSecret, SyncOutcome, USER_UPDATED, UserId,
    VerificationError, WebhookHeaders, WebhookVerifier,
};
use quiz_backend::outbound::cache::MemoryCacheStore;
use quiz_backend::test_support::{
    InMemoryUserStore, MutableClock, SignedDelivery, TEST_WEBHOOK_SECRET, deleted_event,
    sign_delivery, user_event,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use tokio::runtime::Runtime;

const NOW_SECS: i64 = 1_767_225_600;

struct IdentityWorld {
    runtime: Runtime,
    users: Arc<InMemoryUserStore>,
    cache: Arc<MemoryCacheStore>,
    service: IdentitySyncService<InMemoryUserStore, MemoryCacheStore>,
    verifier: WebhookVerifier,
    deliveries: RefCell<u32>,
    outcomes: RefCell<Vec<SyncOutcome>>,
    rejection: RefCell<Option<VerificationError>>,
}

impl IdentityWorld {
    fn new() -> Self {
        let now = DateTime::<Utc>::from_timestamp(NOW_SECS, 0).expect("valid timestamp");
        let clock = Arc::new(MutableClock::new(now));
        let users = Arc::new(InMemoryUserStore::new());
        let cache = Arc::new(MemoryCacheStore::new(clock.clone()));
        let secret = SigningSecret::parse(TEST_WEBHOOK_SECRET).expect("valid secret");
        Self {
            runtime: Runtime::new().expect("tokio runtime should initialize"),
            service: IdentitySyncService::new(Arc::clone(&users), Arc::clone(&cache)),
            verifier: WebhookVerifier::new(secret, clock),
            users,
            cache,
            deliveries: RefCell::new(0),
            outcomes: RefCell::new(Vec::new()),
            rejection: RefCell::new(None),
        }
    }

    fn sign(&self, body: &Value) -> SignedDelivery {
        let mut count = self.deliveries.borrow_mut();
        *count += 1;
        sign_delivery(&self.verifier, &format!("msg_{count}"), NOW_SECS, body)
    }

    fn deliver(&self, delivery: &SignedDelivery) {
        let headers = WebhookHeaders {
            message_id: Some(&delivery.message_id),
            timestamp: Some(&delivery.timestamp),
            signature: Some(&delivery.signature),
        };
        match self.verifier.verify(&headers, &delivery.body) {
            Ok(envelope) => {
                let outcome = self
                    .runtime
                    .block_on(self.service.apply(&envelope))
                    .expect("event applies");
                self.outcomes.borrow_mut().push(outcome);
            }
            Err(error) => {
                *self.rejection.borrow_mut() = Some(error);
            }
        }
    }

    fn is_cached(&self, key: &CacheKey) -> bool {
        self.runtime
            .block_on(self.cache.get(key))
            .expect("memory cache read")
            .is_some()
    }
}

fn quiz_list_key(user: &str) -> CacheKey {
    CacheKey::user_quizzes(&UserId::new(user).expect("valid user id"))
}

#[fixture]
fn world() -> IdentityWorld {
    IdentityWorld::new()
}

#[given("an empty user projection")]
fn an_empty_user_projection(world: &IdentityWorld) {
    assert!(world.users.is_empty());
}

#[given("the quiz list of user {user} is cached")]
fn the_quiz_list_is_cached(world: &IdentityWorld, user: String) {
    let key = quiz_list_key(&user);
    world
        .runtime
        .block_on(world.cache.set_with_ttl(&key, "[]", Duration::from_secs(300)))
        .expect("memory cache write");
    assert!(world.is_cached(&key));
}

#[when("user {user} is updated at {millis} with email {email}")]
fn user_is_updated(world: &IdentityWorld, user: String, millis: i64, email: String) {
    let body = user_event(USER_UPDATED, &user, &email, Some("Ada"), millis);
    let delivery = world.sign(&body);
    world.deliver(&delivery);
}

#[when("user {user} is deleted")]
fn user_is_deleted(world: &IdentityWorld, user: String) {
    let delivery = world.sign(&deleted_event(&user));
    world.deliver(&delivery);
}

#[when("a tampered delivery for user {user} arrives")]
fn a_tampered_delivery_arrives(world: &IdentityWorld, user: String) {
    let body = user_event(
        USER_UPDATED,
        &user,
        "ada@example.com",
        Some("Ada"),
        1_767_225_000_000,
    );
    let mut delivery = world.sign(&body);
    let forged = user_event(
        USER_UPDATED,
        &user,
        "mallory@example.com",
        Some("Ada"),
        1_767_225_000_000,
    );
    delivery.body = forged.to_string().into_bytes();
    world.deliver(&delivery);
}

#[then("user {user} has email {email}")]
fn user_has_email(world: &IdentityWorld, user: String, email: String) {
    let stored = world.users.get(&user).expect("user is stored");
    assert_eq!(AsRef::<str>::as_ref(&stored.email), email.as_str());
}

#[then("the last outcome is {label}")]
fn the_last_outcome_is(world: &IdentityWorld, label: String) {
    let outcomes = world.outcomes.borrow();
    let last = outcomes.last().expect("at least one applied event");
    assert_eq!(last.as_str(), label);
}

#[then("{count} user is stored")]
fn users_are_stored(world: &IdentityWorld, count: usize) {
    assert_eq!(world.users.len(), count);
}

#[then("the delivery is rejected")]
fn the_delivery_is_rejected(world: &IdentityWorld) {
    assert_eq!(
        *world.rejection.borrow(),
        Some(VerificationError::SignatureMismatch)
    );
    assert!(world.outcomes.borrow().is_empty());
}

#[then("the quiz list of user {user} is not cached")]
fn the_quiz_list_is_not_cached(world: &IdentityWorld, user: String) {
    assert!(!world.is_cached(&quiz_list_key(&user)));
}

#[scenario(
    path = "tests/features/identity_sync.feature",
    name = "Duplicate deliveries converge"
)]
fn duplicate_deliveries_converge(world: IdentityWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/identity_sync.feature",
    name = "Out-of-order deliveries keep the newest state"
)]
fn out_of_order_deliveries_keep_the_newest_state(world: IdentityWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/identity_sync.feature",
    name = "Deleted users keep their row with a sentinel email"
)]
fn deleted_users_keep_their_row(world: IdentityWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/identity_sync.feature",
    name = "Deletes for unknown users leave a tombstone"
)]
fn deletes_for_unknown_users_leave_a_tombstone(world: IdentityWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/identity_sync.feature",
    name = "A late update delivered after the delete stays deleted"
)]
fn a_late_update_after_the_delete_stays_deleted(world: IdentityWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/identity_sync.feature",
    name = "Tampered deliveries are rejected"
)]
fn tampered_deliveries_are_rejected(world: IdentityWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/identity_sync.feature",
    name = "Applied updates invalidate the user's quiz list"
)]
fn applied_updates_invalidate_the_quiz_list(world: IdentityWorld) {
    drop(world);
}
