//! Driving port for quiz and attempt writes.

use async_trait::async_trait;

use crate::domain::{
    AttemptCompletion, AttemptStart, AttemptSummary, Error, Quiz, QuizChanges, QuizDetail,
    QuizDraft, QuizId, UserId,
};

/// Domain use-case port for writes that stale cached reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizCommand: Send + Sync {
    /// Create a quiz with its questions.
    async fn create_quiz(&self, draft: QuizDraft) -> Result<QuizDetail, Error>;

    /// Update a quiz header.
    async fn update_quiz(&self, id: &QuizId, changes: QuizChanges) -> Result<Quiz, Error>;

    /// Delete a quiz and its questions.
    async fn delete_quiz(&self, id: &QuizId) -> Result<(), Error>;

    /// Open an attempt at a quiz.
    async fn start_attempt(&self, start: AttemptStart) -> Result<AttemptSummary, Error>;

    /// Record a scored attempt.
    async fn complete_attempt(&self, completion: AttemptCompletion)
    -> Result<AttemptSummary, Error>;

    /// Bookmark a quiz. `false` when it was already bookmarked.
    async fn favorite_quiz(&self, user: &UserId, quiz: &QuizId) -> Result<bool, Error>;

    /// Remove a bookmark. `false` when there was none.
    async fn unfavorite_quiz(&self, user: &UserId, quiz: &QuizId) -> Result<bool, Error>;
}
