//! Namespaced cache keys and their time-to-live table.
//!
//! Keys are only built through the typed constructors so the string layout
//! used by every cache adapter stays in one place.

use std::fmt;
use std::time::Duration;

use super::quiz::QuizId;
use super::user::UserId;

/// Family of cached aggregates sharing a key layout and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// `quiz:{quizId}`: a quiz with its ordered questions.
    Quiz,
    /// `user:{userId}:quizzes`: quizzes authored by a user.
    UserQuizzes,
    /// `public:quizzes`: the public quiz list.
    PublicQuizzes,
    /// `attempts:{userId}:{quizId}`: a user's completed attempts at a quiz.
    Attempts,
    /// `leaderboard:{quizId}`: top attempts for a quiz.
    Leaderboard,
}

impl CacheNamespace {
    /// Every namespace, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Quiz,
        Self::UserQuizzes,
        Self::PublicQuizzes,
        Self::Attempts,
        Self::Leaderboard,
    ];

    /// Time-to-live applied when an entry of this namespace is populated.
    pub fn ttl(self) -> Duration {
        let seconds = match self {
            Self::Quiz => 900,
            Self::UserQuizzes | Self::Leaderboard => 300,
            Self::PublicQuizzes => 600,
            Self::Attempts => 1800,
        };
        Duration::from_secs(seconds)
    }

    /// Leading segment shared by every key in the namespace.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Quiz => "quiz:",
            Self::UserQuizzes => "user:",
            Self::PublicQuizzes => "public:",
            Self::Attempts => "attempts:",
            Self::Leaderboard => "leaderboard:",
        }
    }
}

/// Fully rendered cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: CacheNamespace,
    key: String,
}

impl CacheKey {
    /// Key for a single quiz aggregate.
    ///
    /// # Examples
    /// ```
    /// use quiz_backend::domain::{CacheKey, QuizId};
    /// use uuid::Uuid;
    ///
    /// let key = CacheKey::quiz(&QuizId::from_uuid(Uuid::nil()));
    /// assert_eq!(key.as_str(), "quiz:00000000-0000-0000-0000-000000000000");
    /// assert_eq!(key.ttl().as_secs(), 900);
    /// ```
    pub fn quiz(quiz_id: &QuizId) -> Self {
        Self::render(CacheNamespace::Quiz, format!("quiz:{quiz_id}"))
    }

    /// Key for the quizzes authored by `user_id`.
    pub fn user_quizzes(user_id: &UserId) -> Self {
        Self::render(CacheNamespace::UserQuizzes, format!("user:{user_id}:quizzes"))
    }

    /// Key for the public quiz list.
    pub fn public_quizzes() -> Self {
        Self::render(CacheNamespace::PublicQuizzes, "public:quizzes".to_owned())
    }

    /// Key for a user's attempts at a quiz.
    pub fn quiz_attempts(user_id: &UserId, quiz_id: &QuizId) -> Self {
        Self::render(
            CacheNamespace::Attempts,
            format!("attempts:{user_id}:{quiz_id}"),
        )
    }

    /// Key for a quiz leaderboard.
    pub fn leaderboard(quiz_id: &QuizId) -> Self {
        Self::render(CacheNamespace::Leaderboard, format!("leaderboard:{quiz_id}"))
    }

    fn render(namespace: CacheNamespace, key: String) -> Self {
        Self { namespace, key }
    }

    /// Namespace the key belongs to.
    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    /// TTL from the namespace table.
    pub fn ttl(&self) -> Duration {
        self.namespace.ttl()
    }

    /// Borrow the rendered key.
    pub fn as_str(&self) -> &str {
        self.key.as_str()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
