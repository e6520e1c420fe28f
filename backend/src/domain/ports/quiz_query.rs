//! Driving port for cached quiz reads.
//!
//! Inbound adapters use this port to read quizzes, attempts, and leaderboards
//! without knowing whether the answer came from the cache or the store.

use async_trait::async_trait;

use crate::domain::{AttemptSummary, Error, LeaderboardEntry, Quiz, QuizDetail, QuizId, UserId};

/// Domain use-case port for quiz reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizQuery: Send + Sync {
    /// Fetch a quiz with its ordered questions. `NotFound` when absent.
    async fn get_quiz(&self, id: &QuizId) -> Result<QuizDetail, Error>;

    /// Quizzes authored by `user`.
    async fn list_user_quizzes(&self, user: &UserId) -> Result<Vec<Quiz>, Error>;

    /// The public quiz list.
    async fn list_public_quizzes(&self) -> Result<Vec<Quiz>, Error>;

    /// Completed attempts of `user` at `quiz`.
    async fn list_attempts(&self, user: &UserId, quiz: &QuizId)
    -> Result<Vec<AttemptSummary>, Error>;

    /// Top completed attempts for `quiz`.
    async fn leaderboard(&self, quiz: &QuizId) -> Result<Vec<LeaderboardEntry>, Error>;

    /// Quizzes bookmarked by `user`. Read straight from the store.
    async fn list_favorite_quizzes(&self, user: &UserId) -> Result<Vec<Quiz>, Error>;
}

/// Fixture query backed by no data at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureQuizQuery;

#[async_trait]
impl QuizQuery for FixtureQuizQuery {
    async fn get_quiz(&self, id: &QuizId) -> Result<QuizDetail, Error> {
        Err(Error::not_found(format!("quiz {id} not found")))
    }

    async fn list_user_quizzes(&self, _user: &UserId) -> Result<Vec<Quiz>, Error> {
        Ok(Vec::new())
    }

    async fn list_public_quizzes(&self) -> Result<Vec<Quiz>, Error> {
        Ok(Vec::new())
    }

    async fn list_attempts(
        &self,
        _user: &UserId,
        _quiz: &QuizId,
    ) -> Result<Vec<AttemptSummary>, Error> {
        Ok(Vec::new())
    }

    async fn leaderboard(&self, _quiz: &QuizId) -> Result<Vec<LeaderboardEntry>, Error> {
        Ok(Vec::new())
    }

    async fn list_favorite_quizzes(&self, _user: &UserId) -> Result<Vec<Quiz>, Error> {
        Ok(Vec::new())
    }
}
