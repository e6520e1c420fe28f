//! Port abstraction for quiz and attempt persistence.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AttemptCompletion, AttemptStart, AttemptSummary, LeaderboardEntry, Quiz, QuizChanges,
    QuizDetail, QuizDraft, QuizId, QuizRevision, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by quiz repository adapters.
    pub enum QuizPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "quiz repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "quiz repository query failed: {message}",
        /// The write is blocked by rows that reference the target.
        Conflict { message: String } => "quiz write conflicts with existing records: {message}",
        /// The requested change is invalid for the stored state.
        Rejected { message: String } => "quiz write rejected: {message}",
    }
}

/// Storage operations for quizzes, questions, attempts, and favorites.
///
/// Multi-row writes (quiz with questions, attempt with answers) are atomic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Fetch a quiz with its questions ordered by position.
    async fn find_quiz(&self, id: &QuizId) -> Result<Option<QuizDetail>, QuizPersistenceError>;

    /// Quizzes authored by `creator`, newest first.
    async fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Quiz>, QuizPersistenceError>;

    /// Public quizzes, newest first, capped at `limit`.
    async fn list_public(&self, limit: usize) -> Result<Vec<Quiz>, QuizPersistenceError>;

    /// Completed attempts of `user` at `quiz`, newest first.
    async fn list_completed_attempts(
        &self,
        user: &UserId,
        quiz: &QuizId,
    ) -> Result<Vec<AttemptSummary>, QuizPersistenceError>;

    /// Best completed attempts: score descending, then time spent ascending.
    async fn leaderboard(
        &self,
        quiz: &QuizId,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, QuizPersistenceError>;

    /// Insert a quiz and its questions.
    async fn create_quiz(
        &self,
        draft: &QuizDraft,
        now: DateTime<Utc>,
    ) -> Result<QuizDetail, QuizPersistenceError>;

    /// Apply `changes` to the stored quiz. `None` when the quiz is missing.
    async fn update_quiz(
        &self,
        id: &QuizId,
        changes: &QuizChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<QuizRevision>, QuizPersistenceError>;

    /// Delete a quiz, returning the removed header. `None` when missing.
    async fn delete_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, QuizPersistenceError>;

    /// Open an attempt. `None` when the quiz is missing.
    async fn start_attempt(
        &self,
        start: &AttemptStart,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptSummary>, QuizPersistenceError>;

    /// Close an open attempt and record its answers. `None` when the attempt
    /// is missing or already completed.
    async fn complete_attempt(
        &self,
        completion: &AttemptCompletion,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptSummary>, QuizPersistenceError>;

    /// Bookmark `quiz` for `user`. `false` when it was already bookmarked.
    async fn add_favorite(
        &self,
        user: &UserId,
        quiz: &QuizId,
        now: DateTime<Utc>,
    ) -> Result<bool, QuizPersistenceError>;

    /// Drop a bookmark. `false` when none existed.
    async fn remove_favorite(
        &self,
        user: &UserId,
        quiz: &QuizId,
    ) -> Result<bool, QuizPersistenceError>;

    /// Quizzes bookmarked by `user`, most recently bookmarked first.
    async fn list_favorites(&self, user: &UserId) -> Result<Vec<Quiz>, QuizPersistenceError>;
}
