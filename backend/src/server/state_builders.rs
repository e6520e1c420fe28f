//! Builds the HTTP state from the configured adapters.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use quiz_backend::domain::{IdentitySyncService, QuizService, WebhookVerifier};
use quiz_backend::inbound::http::state::HttpState;
use quiz_backend::outbound::persistence::{DieselQuizRepository, DieselUserProjectionRepository};

use super::ServerConfig;

/// Wire the Diesel repositories and the Redis cache into the domain services.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let users = Arc::new(DieselUserProjectionRepository::new(config.db_pool.clone()));
    let identity_sync = IdentitySyncService::new(users, Arc::clone(&config.cache));

    let quizzes = Arc::new(DieselQuizRepository::new(config.db_pool.clone()));
    let quiz_service = QuizService::new(quizzes, Arc::clone(&config.cache), Arc::clone(&clock));

    let verifier = WebhookVerifier::new(config.webhook_secret.clone(), clock);

    web::Data::new(HttpState::new(
        Arc::new(identity_sync),
        Arc::new(quiz_service),
        verifier,
    ))
}
