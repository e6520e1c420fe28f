//! Quiz domain service.
//!
//! Implements the quiz driving ports on top of the quiz repository and the
//! read-through cache. Reads populate the cache with namespace TTLs; writes
//! commit to the repository first and then invalidate the keys they stale.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    CacheStore, QuizCommand, QuizPersistenceError, QuizQuery, QuizRepository,
};
use crate::domain::{
    AttemptCompletion, AttemptStart, AttemptSummary, CacheKey, Error, LEADERBOARD_LIMIT,
    LeaderboardEntry, PUBLIC_QUIZ_LIMIT, Quiz, QuizChanges, QuizDetail, QuizDraft, QuizId,
    QuizValidationError, ReadThroughCache, UserId,
};

/// Quiz service implementing [`QuizQuery`] and [`QuizCommand`].
pub struct QuizService<R, C: ?Sized> {
    quizzes: Arc<R>,
    cache: ReadThroughCache<C>,
    clock: Arc<dyn Clock>,
}

impl<R, C: ?Sized> Clone for QuizService<R, C> {
    fn clone(&self) -> Self {
        Self {
            quizzes: Arc::clone(&self.quizzes),
            cache: self.cache.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C: CacheStore + ?Sized> QuizService<R, C> {
    /// Create a service over the repository, cache, and clock.
    pub fn new(quizzes: Arc<R>, cache: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self {
            quizzes,
            cache: ReadThroughCache::new(cache),
            clock,
        }
    }
}

fn map_persistence_error(error: QuizPersistenceError) -> Error {
    match error {
        QuizPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("quiz repository unavailable: {message}"))
        }
        QuizPersistenceError::Query { message } => {
            Error::internal(format!("quiz repository error: {message}"))
        }
        QuizPersistenceError::Conflict { message } => Error::conflict(message),
        QuizPersistenceError::Rejected { message } => Error::invalid_request(message),
    }
}

fn map_validation_error(error: &QuizValidationError) -> Error {
    Error::invalid_request(error.to_string())
}

/// Keys staled by a write to `quiz`, given its visibility before and after.
fn quiz_write_keys(quiz: &Quiz, public_before_or_after: bool) -> Vec<CacheKey> {
    let mut keys = vec![
        CacheKey::quiz(&quiz.id),
        CacheKey::user_quizzes(&quiz.creator_id),
    ];
    if public_before_or_after {
        keys.push(CacheKey::public_quizzes());
    }
    keys
}

impl<R, C> QuizService<R, C>
where
    R: QuizRepository,
    C: CacheStore + ?Sized,
{
    async fn invalidate(&self, keys: &[CacheKey]) {
        if let Err(error) = self.cache.invalidate(keys).await {
            let keys: Vec<&str> = keys.iter().map(CacheKey::as_str).collect();
            warn!(?keys, %error, "cache invalidation failed; proceeding with stale entries");
        }
    }
}

#[async_trait]
impl<R, C> QuizQuery for QuizService<R, C>
where
    R: QuizRepository,
    C: CacheStore + ?Sized,
{
    async fn get_quiz(&self, id: &QuizId) -> Result<QuizDetail, Error> {
        self.cache
            .get_or_load(&CacheKey::quiz(id), move || async move {
                self.quizzes
                    .find_quiz(id)
                    .await
                    .map_err(map_persistence_error)?
                    .ok_or_else(|| Error::not_found(format!("quiz {id} not found")))
            })
            .await
    }

    async fn list_user_quizzes(&self, user: &UserId) -> Result<Vec<Quiz>, Error> {
        self.cache
            .get_or_load(&CacheKey::user_quizzes(user), move || async move {
                self.quizzes
                    .list_by_creator(user)
                    .await
                    .map_err(map_persistence_error)
            })
            .await
    }

    async fn list_public_quizzes(&self) -> Result<Vec<Quiz>, Error> {
        self.cache
            .get_or_load(&CacheKey::public_quizzes(), move || async move {
                self.quizzes
                    .list_public(PUBLIC_QUIZ_LIMIT)
                    .await
                    .map_err(map_persistence_error)
            })
            .await
    }

    async fn list_attempts(
        &self,
        user: &UserId,
        quiz: &QuizId,
    ) -> Result<Vec<AttemptSummary>, Error> {
        self.cache
            .get_or_load(&CacheKey::quiz_attempts(user, quiz), move || async move {
                self.quizzes
                    .list_completed_attempts(user, quiz)
                    .await
                    .map_err(map_persistence_error)
            })
            .await
    }

    async fn leaderboard(&self, quiz: &QuizId) -> Result<Vec<LeaderboardEntry>, Error> {
        self.cache
            .get_or_load(&CacheKey::leaderboard(quiz), move || async move {
                self.quizzes
                    .leaderboard(quiz, LEADERBOARD_LIMIT)
                    .await
                    .map_err(map_persistence_error)
            })
            .await
    }

    async fn list_favorite_quizzes(&self, user: &UserId) -> Result<Vec<Quiz>, Error> {
        self.quizzes
            .list_favorites(user)
            .await
            .map_err(map_persistence_error)
    }
}

#[async_trait]
impl<R, C> QuizCommand for QuizService<R, C>
where
    R: QuizRepository,
    C: CacheStore + ?Sized,
{
    async fn create_quiz(&self, draft: QuizDraft) -> Result<QuizDetail, Error> {
        draft.validate().map_err(|err| map_validation_error(&err))?;
        let detail = self
            .quizzes
            .create_quiz(&draft, self.clock.utc())
            .await
            .map_err(map_persistence_error)?;

        info!(quiz_id = %detail.quiz.id, creator_id = %detail.quiz.creator_id, "quiz created");
        self.invalidate(&quiz_write_keys(&detail.quiz, detail.quiz.is_public))
            .await;
        Ok(detail)
    }

    async fn update_quiz(&self, id: &QuizId, changes: QuizChanges) -> Result<Quiz, Error> {
        let revision = self
            .quizzes
            .update_quiz(id, &changes, self.clock.utc())
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(|| Error::not_found(format!("quiz {id} not found")))?;

        info!(quiz_id = %id, "quiz updated");
        self.invalidate(&quiz_write_keys(
            &revision.current,
            revision.touches_public_list(),
        ))
        .await;
        Ok(revision.current)
    }

    async fn delete_quiz(&self, id: &QuizId) -> Result<(), Error> {
        let removed = self
            .quizzes
            .delete_quiz(id)
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(|| Error::not_found(format!("quiz {id} not found")))?;

        info!(quiz_id = %id, "quiz deleted");
        self.invalidate(&quiz_write_keys(&removed, removed.is_public))
            .await;
        Ok(())
    }

    async fn start_attempt(&self, start: AttemptStart) -> Result<AttemptSummary, Error> {
        let attempt = self
            .quizzes
            .start_attempt(&start, self.clock.utc())
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(|| Error::not_found(format!("quiz {} not found", start.quiz_id)))?;

        info!(attempt_id = %attempt.id, quiz_id = %attempt.quiz_id, "attempt started");
        Ok(attempt)
    }

    async fn complete_attempt(
        &self,
        completion: AttemptCompletion,
    ) -> Result<AttemptSummary, Error> {
        completion
            .validate()
            .map_err(|err| map_validation_error(&err))?;
        let attempt = self
            .quizzes
            .complete_attempt(&completion, self.clock.utc())
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "open attempt {} not found",
                    completion.attempt_id
                ))
            })?;

        info!(attempt_id = %attempt.id, quiz_id = %attempt.quiz_id, "attempt completed");
        self.invalidate(&[
            CacheKey::quiz_attempts(&attempt.user_id, &attempt.quiz_id),
            CacheKey::leaderboard(&attempt.quiz_id),
        ])
        .await;
        Ok(attempt)
    }

    async fn favorite_quiz(&self, user: &UserId, quiz: &QuizId) -> Result<bool, Error> {
        let added = self
            .quizzes
            .add_favorite(user, quiz, self.clock.utc())
            .await
            .map_err(map_persistence_error)?;
        if added {
            info!(user_id = %user, quiz_id = %quiz, "quiz favorited");
        }
        Ok(added)
    }

    async fn unfavorite_quiz(&self, user: &UserId, quiz: &QuizId) -> Result<bool, Error> {
        let removed = self
            .quizzes
            .remove_favorite(user, quiz)
            .await
            .map_err(map_persistence_error)?;
        if removed {
            info!(user_id = %user, quiz_id = %quiz, "quiz unfavorited");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "quiz_service_tests.rs"]
mod tests;
