//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and depend only on driving
//! ports, so they can be exercised with mocks and no I/O.

use std::sync::Arc;

use crate::domain::WebhookVerifier;
use crate::domain::ports::{IdentitySyncCommand, QuizQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub identity_sync: Arc<dyn IdentitySyncCommand>,
    pub quizzes: Arc<dyn QuizQuery>,
    pub verifier: WebhookVerifier,
}

impl HttpState {
    pub fn new(
        identity_sync: Arc<dyn IdentitySyncCommand>,
        quizzes: Arc<dyn QuizQuery>,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            identity_sync,
            quizzes,
            verifier,
        }
    }
}
